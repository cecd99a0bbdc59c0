//! Raw accumulation and saturating incremental statistics.
//!
//! Two bounded-memory running means per channel: the value average (the
//! calibrated baseline) and the noise power (mean squared delta). Both weight
//! new samples by `1/(counter+1)` with the counter saturating at
//! `filter_window - 1`, so the effective weight decreases during calibration
//! and then stabilizes at `1/filter_window`.

use crate::channel::{Channel, Direction};
use crate::state::ButtonState;

/// Fold one raw measurement into the channel's per-scan accumulator.
///
/// With the slew-rate limiter enabled the accumulator tracks the sample by at
/// most ±1 per measurement (the first sample of a scan seeds it exactly);
/// otherwise all measurements of the scan are summed.
pub(crate) fn accumulate(d: &mut Channel, sample: i32) {
    let sample = i64::from(sample);
    if d.enable_slewrate_limiter {
        if d.slewrate_first_sample {
            d.raw = sample;
            d.slewrate_first_sample = false;
        } else {
            if sample > d.raw {
                d.raw += 1;
            }
            if sample < d.raw {
                d.raw -= 1;
            }
        }
    } else {
        d.raw += sample;
    }
}

/// Update the baseline average (and, past calibration, the noise power).
///
/// Suppression: a channel that is out of calibration and not forcibly
/// recalibrating skips the update while another channel's touch is active and
/// the matching opt-in flag is set, so its baseline cannot drift toward a
/// neighbour's field.
pub(crate) fn update_avg(d: &mut Channel, any_approached: bool, any_pressed: bool) {
    if !d.forced_cal
        && d.state >= ButtonState::Released
        && d.suppress_update_if_any_approached
        && any_approached
    {
        return;
    }
    if !d.forced_cal
        && d.state >= ButtonState::Released
        && d.suppress_update_if_any_pressed
        && any_pressed
    {
        return;
    }

    let counter = f32::from(d.counter);
    d.avg = (counter * d.avg + d.value) / (counter + 1.0);

    // Only measure noise once the baseline is meaningful.
    if d.enable_noise_power_measurement && d.state > ButtonState::Calibrating {
        let s = d.delta * d.delta;
        let noise_counter = f32::from(d.noise_counter);
        d.noise_power = (noise_counter * d.noise_power + s) / (noise_counter + 1.0);

        if d.noise_counter + 1 < d.filter_window {
            d.noise_counter += 1;
        }
    }

    if d.counter + 1 < d.filter_window {
        d.counter += 1;
    }
}

/// Recompute the direction-adjusted delta and track its lifetime maximum.
///
/// Before the baseline exists (states below `NoisePowerMeasurement`) the delta
/// is pinned to 0 so nothing downstream can trigger on garbage.
pub(crate) fn refresh_delta(d: &mut Channel) {
    if d.state < ButtonState::NoisePowerMeasurement {
        d.delta = 0.0;
    } else {
        d.delta = match d.direction {
            Direction::Negative => d.avg - d.value,
            Direction::Positive => d.value - d.avg,
        };

        if d.max_delta < d.delta {
            d.max_delta = d.delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel {
            filter_window: 16,
            ..Channel::default()
        }
    }

    #[test]
    fn identical_updates_keep_the_average_exact() {
        let mut d = channel();
        d.value = 42.0;
        for _ in 0..15 {
            update_avg(&mut d, false, false);
            assert_eq!(d.avg, 42.0);
        }
        assert_eq!(d.counter, 15);
        // Saturated: further updates hold the counter and keep the value.
        update_avg(&mut d, false, false);
        assert_eq!(d.counter, 15);
        assert_eq!(d.avg, 42.0);
    }

    #[test]
    fn saturated_weight_is_one_over_window() {
        let mut d = channel();
        d.value = 0.0;
        for _ in 0..20 {
            update_avg(&mut d, false, false);
        }
        d.value = 16.0;
        update_avg(&mut d, false, false);
        // (15 * 0 + 16) / 16 = 1.
        assert!((d.avg - 1.0).abs() < 1e-6);
    }

    #[test]
    fn suppression_skips_released_channels_only() {
        let mut d = channel();
        d.suppress_update_if_any_pressed = true;
        d.state = ButtonState::Released;
        d.avg = 10.0;
        d.counter = 15;
        d.value = 100.0;
        update_avg(&mut d, false, true);
        assert_eq!(d.avg, 10.0);

        // Calibrating channels always average.
        d.state = ButtonState::Calibrating;
        update_avg(&mut d, false, true);
        assert!(d.avg > 10.0);
    }

    #[test]
    fn forced_recalibration_bypasses_suppression() {
        let mut d = channel();
        d.suppress_update_if_any_approached = true;
        d.state = ButtonState::Released;
        d.forced_cal = true;
        d.avg = 10.0;
        d.value = 100.0;
        d.counter = 0;
        update_avg(&mut d, true, false);
        assert_eq!(d.avg, 100.0);
    }

    #[test]
    fn noise_power_needs_opt_in_and_a_baseline() {
        let mut d = channel();
        d.enable_noise_power_measurement = true;
        d.state = ButtonState::Calibrating;
        d.delta = 3.0;
        update_avg(&mut d, false, false);
        assert_eq!(d.noise_power, 0.0);

        d.state = ButtonState::NoisePowerMeasurement;
        update_avg(&mut d, false, false);
        assert_eq!(d.noise_power, 9.0);
        assert_eq!(d.noise_counter, 1);
    }

    #[test]
    fn slewrate_limits_movement_to_one_per_measurement() {
        let mut d = channel();
        d.enable_slewrate_limiter = true;
        d.slewrate_first_sample = true;
        accumulate(&mut d, 100);
        assert_eq!(d.raw, 100);
        accumulate(&mut d, 200);
        assert_eq!(d.raw, 101);
        accumulate(&mut d, 0);
        assert_eq!(d.raw, 100);
        accumulate(&mut d, 100);
        assert_eq!(d.raw, 100);
    }

    #[test]
    fn summing_accumulator_without_limiter() {
        let mut d = channel();
        accumulate(&mut d, 100);
        accumulate(&mut d, 100);
        accumulate(&mut d, -50);
        assert_eq!(d.raw, 150);
    }

    #[test]
    fn delta_is_pinned_to_zero_while_calibrating() {
        let mut d = channel();
        d.state = ButtonState::Calibrating;
        d.avg = 10.0;
        d.value = 90.0;
        refresh_delta(&mut d);
        assert_eq!(d.delta, 0.0);

        d.state = ButtonState::Released;
        refresh_delta(&mut d);
        assert_eq!(d.delta, 80.0);
        assert_eq!(d.max_delta, 80.0);

        d.value = 50.0;
        refresh_delta(&mut d);
        assert_eq!(d.delta, 40.0);
        assert_eq!(d.max_delta, 80.0);
    }

    #[test]
    fn negative_direction_flips_the_delta() {
        let mut d = channel();
        d.direction = Direction::Negative;
        d.state = ButtonState::Released;
        d.avg = 100.0;
        d.value = 30.0;
        refresh_delta(&mut d);
        assert_eq!(d.delta, 70.0);
    }
}
