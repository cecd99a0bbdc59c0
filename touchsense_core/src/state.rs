//! Per-channel button lifecycle states.
//!
//! The numeric order is part of the contract: range comparisons such as
//! `state >= ButtonState::Pressed` are used throughout the engine and by
//! application code, so variants must never be reordered.

/// Lifecycle state of one sensing channel.
///
/// States at or below `NoisePowerMeasurement` count as calibrating, states in
/// `Approached..=ApproachedToReleased` count as approached, and states at or
/// above `Pressed` count as touched. The `*To*` variants are dwell states: the
/// channel sits there until the condition has held for the configured time.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ButtonState {
    PreCalibrating = 0,
    Calibrating = 1,
    NoisePowerMeasurement = 2,
    Released = 3,
    ReleasedToApproached = 4,
    Approached = 5,
    ApproachedToPressed = 6,
    ApproachedToReleased = 7,
    Pressed = 8,
    PressedToApproached = 9,
}

impl ButtonState {
    /// Human-readable label, for logs and tuning output.
    pub fn label(self) -> &'static str {
        match self {
            Self::PreCalibrating => "PreCalibrating",
            Self::Calibrating => "Calibrating",
            Self::NoisePowerMeasurement => "NoisePowerMeasurement",
            Self::Released => "Released",
            Self::ReleasedToApproached => "ReleasedToApproached",
            Self::Approached => "Approached",
            Self::ApproachedToPressed => "ApproachedToPressed",
            Self::ApproachedToReleased => "ApproachedToReleased",
            Self::Pressed => "Pressed",
            Self::PressedToApproached => "PressedToApproached",
        }
    }

    /// Decode a raw state index; anything out of range falls back to
    /// `PreCalibrating`, the safe restart state.
    pub fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::PreCalibrating,
            1 => Self::Calibrating,
            2 => Self::NoisePowerMeasurement,
            3 => Self::Released,
            4 => Self::ReleasedToApproached,
            5 => Self::Approached,
            6 => Self::ApproachedToPressed,
            7 => Self::ApproachedToReleased,
            8 => Self::Pressed,
            9 => Self::PressedToApproached,
            _ => Self::PreCalibrating,
        }
    }
}

impl core::fmt::Display for ButtonState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a transition is worth reporting to the application.
///
/// Movements into or out of the transitional dwell states are routine churn;
/// only arrivals at a settled state from somewhere unexpected qualify.
pub fn is_major_change(old: ButtonState, new: ButtonState) -> bool {
    use ButtonState::*;

    if new == PreCalibrating {
        return true;
    }
    if new == Calibrating && old != PreCalibrating {
        return true;
    }
    if new == Released && old != ReleasedToApproached {
        return true;
    }
    if new == Approached && old != ApproachedToReleased && old != ApproachedToPressed {
        return true;
    }
    if new == Pressed && old != PressedToApproached {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use ButtonState::*;

    #[test]
    fn numeric_order_is_stable() {
        assert!(PreCalibrating < Calibrating);
        assert!(NoisePowerMeasurement < Released);
        assert!(ApproachedToPressed < ApproachedToReleased);
        assert!(Pressed < PressedToApproached);
        assert_eq!(Pressed as u8, 8);
    }

    #[test]
    fn settled_arrivals_are_major() {
        assert!(is_major_change(Released, PreCalibrating));
        assert!(is_major_change(Approached, Calibrating));
        assert!(is_major_change(PreCalibrating, Released));
        assert!(is_major_change(Released, Approached));
        assert!(is_major_change(Approached, Pressed));
    }

    #[test]
    fn dwell_roundtrips_are_minor() {
        assert!(!is_major_change(PreCalibrating, Calibrating));
        assert!(!is_major_change(ReleasedToApproached, Released));
        assert!(!is_major_change(ApproachedToReleased, Approached));
        assert!(!is_major_change(ApproachedToPressed, Approached));
        assert!(!is_major_change(PressedToApproached, Pressed));
        assert!(!is_major_change(Released, ReleasedToApproached));
        assert!(!is_major_change(Approached, ApproachedToPressed));
    }

    #[test]
    fn out_of_range_index_falls_back_to_precalibrating() {
        assert_eq!(ButtonState::from_index(10), PreCalibrating);
        assert_eq!(ButtonState::from_index(255), PreCalibrating);
        assert_eq!(ButtonState::from_index(9), PressedToApproached);
    }
}
