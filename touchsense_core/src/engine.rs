//! The multi-channel scan engine.
//!
//! Owns every channel and its bound sample method, and advances the whole
//! array one scan at a time: raw acquisition over the randomized scan order,
//! accumulation, per-channel state machine, then summary-flag aggregation.
//! Strictly single-threaded and non-blocking; the caller drives `run_scan`
//! from its own control loop.

use std::sync::Arc;
use std::time::Instant;

use touchsense_traits::NvStore;
use touchsense_traits::clock::Clock;

use crate::channel::{Channel, SampleType};
use crate::error::{SensorError, SettingsError};
use crate::filter;
use crate::method::SampleMethod;
use crate::settings;
use crate::state::{ButtonState, is_major_change};

/// Callback invoked on major state changes: `(channel, old, new)`.
pub type StateChangeCallback = Box<dyn FnMut(usize, ButtonState, ButtonState)>;

pub struct TouchEngine {
    pub(crate) channels: Vec<Channel>,
    pub(crate) methods: Vec<Option<Box<dyn SampleMethod>>>,
    pub(crate) scan_order: Vec<u8>,
    pub(crate) measurements_per_channel: usize,
    pub(crate) any_approached: bool,
    pub(crate) any_pressed: bool,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) epoch: Instant,
    pub(crate) callback: Option<StateChangeCallback>,
    pub(crate) settings_store: Option<Box<dyn NvStore>>,
    pub(crate) settings_offset: usize,
    pub(crate) last_error: Option<SensorError>,
}

impl core::fmt::Debug for TouchEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TouchEngine")
            .field("channels", &self.channels.len())
            .field("measurements_per_channel", &self.measurements_per_channel)
            .field("any_approached", &self.any_approached)
            .field("any_pressed", &self.any_pressed)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl TouchEngine {
    /// Start building an engine.
    pub fn builder() -> crate::builder::TouchEngineBuilder<crate::builder::Missing, crate::builder::Missing>
    {
        crate::builder::TouchEngineBuilder::default()
    }

    /// Bind `method` to channel `ch` and force it back to `PreCalibrating`.
    ///
    /// The method's own `setup` runs first and may fill in method-specific
    /// channel defaults; if it fails the binding is dropped, the error is
    /// recorded on the engine, and the channel keeps sampling as zero.
    pub fn initialize(
        &mut self,
        ch: usize,
        mut method: Box<dyn SampleMethod>,
    ) -> Result<(), SensorError> {
        match method.setup(&mut self.channels, ch) {
            Ok(()) => {
                self.methods[ch] = Some(method);
                self.set_state(ch, ButtonState::PreCalibrating);
                Ok(())
            }
            Err(e) => {
                let err = SensorError::SampleSetup {
                    channel: ch,
                    reason: e.to_string(),
                };
                tracing::warn!(channel = ch, error = %err, "sample method setup failed");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Run one full scan: every channel is measured `measurements_per_channel`
    /// times in scan order, then advanced through its state machine.
    ///
    /// Individual hook failures degrade to zero samples and never abort the
    /// scan; the returned error reflects the engine's recorded error state
    /// (setup or settings failures), not per-scan sampling trouble.
    pub fn run_scan(&mut self) -> Result<(), SensorError> {
        for d in &mut self.channels {
            d.raw = 0;
            d.slewrate_first_sample = true;
        }

        for ch in 0..self.channels.len() {
            if self.channels[ch].disabled {
                continue;
            }
            if let Some(m) = self.methods[ch].as_mut() {
                if let Err(e) = m.pre_sample(&mut self.channels, ch) {
                    tracing::warn!(channel = ch, error = %e, "pre-sample hook failed");
                }
            }
        }

        for pos in 0..self.scan_order.len() {
            let ch = usize::from(self.scan_order[pos]);
            if self.channels[ch].disabled {
                continue;
            }

            let sample_type = self.channels[ch].sample_type;
            let mut sample1 = 0i32;
            let mut sample2 = 0i32;

            if sample_type.wants_normal() {
                sample1 = self.sample_one(ch, false);
            }
            if sample_type.wants_inverted() {
                sample2 = self.sample_one(ch, true);
            }

            // A lone normal or inverted reading is doubled so its amplitude
            // matches a differential one.
            if sample_type == SampleType::Normal {
                sample1 <<= 1;
            }
            if sample_type == SampleType::Inverted {
                sample2 <<= 1;
            }

            filter::accumulate(&mut self.channels[ch], sample1 + sample2);
        }

        let now = self.clock.ms_since(self.epoch);

        for ch in 0..self.channels.len() {
            self.channels[ch].last_sampled_at_ms = now;
            if self.channels[ch].disabled {
                continue;
            }
            if let Some(m) = self.methods[ch].as_mut() {
                if let Err(e) = m.post_sample(&mut self.channels, ch) {
                    tracing::warn!(channel = ch, error = %e, "post-sample hook failed");
                }
            }
            self.process_sample(ch);
        }

        self.refresh_summaries();

        match &self.last_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn sample_one(&mut self, ch: usize, inverted: bool) -> i32 {
        match self.methods[ch].as_mut() {
            Some(m) => match m.sample(&mut self.channels, ch, inverted) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(channel = ch, inverted, error = %e, "sample hook failed, using 0");
                    0
                }
            },
            None => 0,
        }
    }

    /// Transition channel `ch` to `new_state`, honoring the re-entrancy
    /// guard, the dwell-refresh suppression rule, and the channel's
    /// forced-recalibration masks.
    pub fn set_state(&mut self, ch: usize, new_state: ButtonState) {
        if self.channels[ch].state_guard {
            // This channel is already mid-transition; break the cycle.
            return;
        }

        let old = self.channels[ch].state;

        // Reverting to the touched side keeps the original entry timestamp;
        // otherwise a sensor flapping around a release threshold would never
        // accumulate enough continuous dwell to hit its periodic
        // recalibration timeout.
        let mut refresh_entry_time = !matches!(
            (old, new_state),
            (ButtonState::ApproachedToReleased, ButtonState::Approached)
                | (ButtonState::PressedToApproached, ButtonState::Pressed)
        );

        if old == new_state {
            return;
        }

        self.channels[ch].state_guard = true;
        let mut new_state = new_state;
        let mut mask = 0u32;

        {
            let d = &mut self.channels[ch];
            match new_state {
                ButtonState::Calibrating => {
                    d.counter = 0;
                    d.noise_counter = 0;
                    d.avg = 0.0;
                    d.max_delta = 0.0;
                    d.noise_power = 0.0;
                    d.forced_cal = false;
                    if !d.set_offset_manually {
                        // Re-established after calibration completes.
                        d.offset_value = 0.0;
                    }
                }
                ButtonState::Released if old == ButtonState::ApproachedToReleased => {
                    mask = d.force_calibration_when_releasing_from_approached;
                }
                ButtonState::Approached => {
                    if old == ButtonState::ReleasedToApproached {
                        mask = d.force_calibration_when_approaching_from_released;
                    }
                    if old == ButtonState::PressedToApproached {
                        mask = d.force_calibration_when_approaching_from_pressed;
                    }
                }
                ButtonState::Pressed => {
                    mask = d.force_calibration_when_pressing;
                }
                _ => {}
            }
        }

        if mask != 0 {
            // The mask may include this very channel, in which case it wins
            // over the nominal destination and the entry timestamp is
            // refreshed even for a revert.
            refresh_entry_time |= self.force_calibrating(ch, mask, &mut new_state);
        }

        if refresh_entry_time {
            let d = &mut self.channels[ch];
            d.state_changed_at_ms = d.last_sampled_at_ms;
        }

        self.channels[ch].state = new_state;

        if is_major_change(old, new_state) {
            tracing::debug!(channel = ch, from = %old, to = %new_state, "state change");
            if let Some(cb) = self.callback.as_mut() {
                cb(ch, old, new_state);
            }
        }

        self.channels[ch].state_guard = false;
    }

    /// Drive every channel in `mask` to `PreCalibrating` out of band, with
    /// the forced-calibration flag set; e.g. after a known environmental
    /// shift (lid closed, device docked).
    pub fn force_recalibrate(&mut self, mask: u32) {
        for n in 0..self.channels.len() {
            if mask & (1 << n) != 0 {
                self.set_state(n, ButtonState::PreCalibrating);
                self.channels[n].forced_cal = true;
            }
        }
    }

    /// Drive every channel in `mask` to `PreCalibrating` with its
    /// forced-calibration flag set. Returns whether `ch` itself was in the
    /// mask (its pending destination is overridden in place).
    fn force_calibrating(&mut self, ch: usize, mask: u32, new_state: &mut ButtonState) -> bool {
        let mut own_state_changed = false;

        for n in 0..self.channels.len() {
            if mask & (1 << n) != 0 {
                if n == ch {
                    own_state_changed = true;
                    *new_state = ButtonState::PreCalibrating;
                } else {
                    self.set_state(n, ButtonState::PreCalibrating);
                }
                self.channels[n].forced_cal = true;
            }
        }

        own_state_changed
    }

    fn update_avg(&mut self, ch: usize) {
        let (any_approached, any_pressed) = (self.any_approached, self.any_pressed);
        filter::update_avg(&mut self.channels[ch], any_approached, any_pressed);
    }

    fn process_sample(&mut self, ch: usize) {
        filter::refresh_delta(&mut self.channels[ch]);

        match self.channels[ch].state {
            ButtonState::PreCalibrating => self.process_pre_calibrating(ch),
            ButtonState::Calibrating => self.process_calibrating(ch),
            ButtonState::NoisePowerMeasurement => self.process_noise_power_measurement(ch),
            ButtonState::Released => self.process_released(ch),
            ButtonState::ReleasedToApproached => self.process_released_to_approached(ch),
            ButtonState::Approached => self.process_approached(ch),
            ButtonState::ApproachedToPressed => self.process_approached_to_pressed(ch),
            ButtonState::ApproachedToReleased => self.process_approached_to_released(ch),
            ButtonState::Pressed => self.process_pressed(ch),
            ButtonState::PressedToApproached => self.process_pressed_to_approached(ch),
        }
    }

    fn process_pre_calibrating(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if d.dwell_ms() >= d.pre_calibration_ms {
            self.set_state(ch, ButtonState::Calibrating);
        }
    }

    fn process_calibrating(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if d.counter + 1 < d.filter_window || d.dwell_ms() < d.calibration_ms {
            self.update_avg(ch);
        } else {
            self.set_state(ch, ButtonState::NoisePowerMeasurement);

            let d = &mut self.channels[ch];
            if !d.set_offset_manually {
                d.offset_value = d.avg;
            }
        }
    }

    fn process_noise_power_measurement(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if d.enable_noise_power_measurement && d.dwell_ms() < d.calibration_ms {
            self.update_avg(ch);
        } else {
            self.set_state(ch, ButtonState::Released);
        }
    }

    fn process_released(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if d.enable_state_machine && d.delta_indicates_approached() {
            self.set_state(ch, ButtonState::ReleasedToApproached);
        } else {
            self.update_avg(ch);
        }
    }

    fn process_released_to_approached(&mut self, ch: usize) {
        // No baseline updates in transitional states.
        let d = &self.channels[ch];
        if !d.enable_state_machine {
            return;
        }

        if d.delta_indicates_approached() {
            if d.dwell_ms() >= d.released_to_approached_ms {
                self.set_state(ch, ButtonState::Approached);
            }
        } else {
            self.set_state(ch, ButtonState::Released);
        }
    }

    fn process_approached(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if !d.enable_state_machine {
            return;
        }

        if d.delta_indicates_released() {
            self.set_state(ch, ButtonState::ApproachedToReleased);
        } else if d.delta_indicates_pressed() {
            self.set_state(ch, ButtonState::ApproachedToPressed);
        } else if d.approached_timeout_ms > 0 && d.dwell_ms() > d.approached_timeout_ms {
            self.set_state(ch, ButtonState::Calibrating);
        }
    }

    fn process_approached_to_pressed(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if !d.enable_state_machine {
            return;
        }

        if d.delta_indicates_pressed() {
            if d.dwell_ms() >= d.approached_to_pressed_ms {
                self.set_state(ch, ButtonState::Pressed);
            }
        } else {
            self.set_state(ch, ButtonState::Approached);
        }
    }

    fn process_approached_to_released(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if !d.enable_state_machine {
            return;
        }

        if d.delta_indicates_released() {
            if d.dwell_ms() >= d.approached_to_released_ms {
                self.set_state(ch, ButtonState::Released);
            }
        } else {
            self.set_state(ch, ButtonState::Approached);
        }
    }

    fn process_pressed(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if !d.enable_state_machine {
            return;
        }

        if d.delta_indicates_pressed() {
            if d.pressed_timeout_ms > 0 && d.dwell_ms() > d.pressed_timeout_ms {
                self.set_state(ch, ButtonState::Calibrating);
            }
        } else {
            self.set_state(ch, ButtonState::PressedToApproached);
        }
    }

    fn process_pressed_to_approached(&mut self, ch: usize) {
        let d = &self.channels[ch];
        if !d.enable_state_machine {
            return;
        }

        if d.delta_indicates_pressed() {
            self.set_state(ch, ButtonState::Pressed);
        } else if d.dwell_ms() >= d.pressed_to_approached_ms {
            self.set_state(ch, ButtonState::Approached);
        }
    }

    /// Recompute the four per-channel flags and the two global flags from the
    /// post-scan states. Disabled channels report nothing.
    fn refresh_summaries(&mut self) {
        self.any_approached = false;
        self.any_pressed = false;

        for d in &mut self.channels {
            d.is_calibrating = false;
            d.is_released = false;
            d.is_approached = false;
            d.is_pressed = false;
            if d.disabled {
                continue;
            }

            if d.state <= ButtonState::NoisePowerMeasurement {
                d.is_calibrating = true;
            }
            if d.state >= ButtonState::Released && d.state <= ButtonState::ReleasedToApproached {
                d.is_released = true;
            }
            if d.state >= ButtonState::Approached {
                d.is_approached = true;
                self.any_approached = true;
            }
            if d.state >= ButtonState::Pressed {
                d.is_pressed = true;
                self.any_pressed = true;
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn measurements_per_channel(&self) -> usize {
        self.measurements_per_channel
    }

    pub fn channel(&self, ch: usize) -> &Channel {
        &self.channels[ch]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut Channel {
        &mut self.channels[ch]
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn scan_order(&self) -> &[u8] {
        &self.scan_order
    }

    /// The sample method bound to `ch`, if `initialize` succeeded for it.
    pub fn method(&self, ch: usize) -> Option<&dyn SampleMethod> {
        self.methods[ch].as_deref()
    }

    pub fn state(&self, ch: usize) -> ButtonState {
        self.channels[ch].state
    }

    pub fn state_label(&self, ch: usize) -> &'static str {
        self.channels[ch].state.label()
    }

    pub fn raw(&self, ch: usize) -> i64 {
        self.channels[ch].raw
    }

    pub fn value(&self, ch: usize) -> f32 {
        self.channels[ch].value
    }

    pub fn avg(&self, ch: usize) -> f32 {
        self.channels[ch].avg
    }

    pub fn delta(&self, ch: usize) -> f32 {
        self.channels[ch].delta
    }

    pub fn max_delta(&self, ch: usize) -> f32 {
        self.channels[ch].max_delta
    }

    pub fn noise_power(&self, ch: usize) -> f32 {
        self.channels[ch].noise_power
    }

    pub fn is_calibrating(&self, ch: usize) -> bool {
        self.channels[ch].is_calibrating
    }

    pub fn is_released(&self, ch: usize) -> bool {
        self.channels[ch].is_released
    }

    pub fn is_approached(&self, ch: usize) -> bool {
        self.channels[ch].is_approached
    }

    pub fn is_pressed(&self, ch: usize) -> bool {
        self.channels[ch].is_pressed
    }

    pub fn any_approached(&self) -> bool {
        self.any_approached
    }

    pub fn any_pressed(&self) -> bool {
        self.any_pressed
    }

    pub fn any_calibrating(&self) -> bool {
        self.channels
            .iter()
            .any(|d| !d.disabled && d.state <= ButtonState::NoisePowerMeasurement)
    }

    /// Last recorded engine error (setup or settings), if any.
    pub fn last_error(&self) -> Option<&SensorError> {
        self.last_error.as_ref()
    }

    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    /// Install the major-state-change notification callback.
    pub fn set_state_change_callback(&mut self, cb: StateChangeCallback) {
        self.callback = Some(cb);
    }

    // ── Settings ─────────────────────────────────────────────────────────────

    /// Persist the current per-channel thresholds to the bound store.
    pub fn write_settings(&mut self) -> Result<(), SettingsError> {
        let Some(store) = self.settings_store.as_mut() else {
            return Err(SettingsError::Backend("no settings store bound".into()));
        };
        let res = settings::write_settings(store.as_mut(), self.settings_offset, &self.channels);
        if let Err(e) = &res {
            self.last_error = Some(SensorError::Settings(e.clone()));
        }
        res
    }

    /// Re-read thresholds from the bound store; on any integrity error every
    /// channel keeps its current values.
    pub fn reload_settings(&mut self) -> Result<(), SettingsError> {
        let Some(store) = self.settings_store.as_ref() else {
            return Err(SettingsError::Backend("no settings store bound".into()));
        };
        let res = settings::read_settings(store.as_ref(), self.settings_offset, &mut self.channels);
        if let Err(e) = &res {
            self.last_error = Some(SensorError::Settings(e.clone()));
        }
        res
    }
}
