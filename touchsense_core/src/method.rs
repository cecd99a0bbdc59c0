//! Pluggable sampling interface.
//!
//! The engine never touches hardware itself; each channel is bound to a
//! `SampleMethod` during `initialize` and all raw acquisition goes through it.
//! Hooks receive borrowed access to the full channel slice (methods may need
//! neighbouring pins, e.g. for charge-transfer reference electrodes) and must
//! not retain it past the call.

use std::error::Error;

use crate::channel::Channel;

/// Hook errors are ordinary boxed errors; the engine degrades a failing
/// sample hook to a zero reading instead of propagating.
pub type HookResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Transduction family of a sample method, used for glyph selection in bar
/// rendering and for sensor-pair bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Charge-transfer capacitive sampling.
    ChargeTransfer,
    /// Resistive (voltage-divider) sampling.
    Resistive,
    /// Microcontroller touch peripheral.
    PeripheralTouch,
    /// User-supplied method.
    Custom,
}

/// A per-channel transduction method.
///
/// `setup` runs once during `initialize` and is the place to fill in
/// method-specific channel defaults (thresholds, `reference_value`,
/// `scale_factor`). `sample` produces one raw reading; when `inverted` is true
/// an inverted measurement is requested for pseudo-differential sampling, and
/// methods that cannot invert should return 0. `post_sample` converts the
/// accumulated `raw` into `value` in the method's units.
pub trait SampleMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::Custom
    }

    fn setup(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()>;

    fn pre_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        let _ = (channels, ch);
        Ok(())
    }

    fn sample(&mut self, channels: &mut [Channel], ch: usize, inverted: bool) -> HookResult<i32>;

    fn post_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        let _ = (channels, ch);
        Ok(())
    }

    /// Map the channel's current delta onto a bar of `length` cells.
    ///
    /// The default scales linearly against `calibrated_max_delta` (falling
    /// back to the press threshold when unset) and clamps to the bar.
    fn map_delta(&self, channels: &[Channel], ch: usize, length: usize) -> usize {
        let d = &channels[ch];
        let full_scale = if d.calibrated_max_delta > 0.0 {
            d.calibrated_max_delta
        } else {
            d.approached_to_pressed_threshold
        };
        if full_scale <= 0.0 || !d.delta.is_finite() {
            return 0;
        }
        let frac = (d.delta / full_scale).clamp(0.0, 1.0);
        (frac * length as f32).round() as usize
    }
}

/// Closure-backed `SampleMethod` for custom transduction.
///
/// Only the sample closure is mandatory; hooks default to no-ops and
/// `post_sample` defaults to `value = raw * scale_factor`.
pub struct FnSampleMethod {
    sample: Box<dyn FnMut(&mut [Channel], usize, bool) -> HookResult<i32>>,
    setup: Option<Box<dyn FnMut(&mut [Channel], usize) -> HookResult<()>>>,
    pre: Option<Box<dyn FnMut(&mut [Channel], usize) -> HookResult<()>>>,
    post: Option<Box<dyn FnMut(&mut [Channel], usize) -> HookResult<()>>>,
}

impl FnSampleMethod {
    pub fn new(
        sample: impl FnMut(&mut [Channel], usize, bool) -> HookResult<i32> + 'static,
    ) -> Self {
        Self {
            sample: Box::new(sample),
            setup: None,
            pre: None,
            post: None,
        }
    }

    pub fn with_setup(
        mut self,
        setup: impl FnMut(&mut [Channel], usize) -> HookResult<()> + 'static,
    ) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn with_pre_sample(
        mut self,
        pre: impl FnMut(&mut [Channel], usize) -> HookResult<()> + 'static,
    ) -> Self {
        self.pre = Some(Box::new(pre));
        self
    }

    pub fn with_post_sample(
        mut self,
        post: impl FnMut(&mut [Channel], usize) -> HookResult<()> + 'static,
    ) -> Self {
        self.post = Some(Box::new(post));
        self
    }
}

impl SampleMethod for FnSampleMethod {
    fn setup(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        match self.setup.as_mut() {
            Some(f) => f(channels, ch),
            None => Ok(()),
        }
    }

    fn pre_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        match self.pre.as_mut() {
            Some(f) => f(channels, ch),
            None => Ok(()),
        }
    }

    fn sample(&mut self, channels: &mut [Channel], ch: usize, inverted: bool) -> HookResult<i32> {
        (self.sample)(channels, ch, inverted)
    }

    fn post_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        match self.post.as_mut() {
            Some(f) => f(channels, ch),
            None => {
                let d = &mut channels[ch];
                d.value = d.raw as f32 * d.scale_factor;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_method_samples_and_converts() {
        let mut m = FnSampleMethod::new(|_channels, _ch, inverted| {
            Ok(if inverted { 0 } else { 7 })
        })
        .with_setup(|channels, ch| {
            channels[ch].scale_factor = 0.5;
            Ok(())
        });

        let mut channels = vec![Channel::default()];
        m.setup(&mut channels, 0).unwrap();
        assert_eq!(m.sample(&mut channels, 0, false).unwrap(), 7);
        assert_eq!(m.sample(&mut channels, 0, true).unwrap(), 0);

        channels[0].raw = 100;
        m.post_sample(&mut channels, 0).unwrap();
        assert_eq!(channels[0].value, 50.0);
        assert_eq!(m.kind(), MethodKind::Custom);
    }

    #[test]
    fn default_bar_mapping_clamps_to_the_bar() {
        let m = FnSampleMethod::new(|_, _, _| Ok(0));
        let mut channels = vec![Channel::default()];
        channels[0].calibrated_max_delta = 100.0;

        channels[0].delta = 50.0;
        assert_eq!(m.map_delta(&channels, 0, 40), 20);
        channels[0].delta = 250.0;
        assert_eq!(m.map_delta(&channels, 0, 40), 40);
        channels[0].delta = -10.0;
        assert_eq!(m.map_delta(&channels, 0, 40), 0);
    }
}
