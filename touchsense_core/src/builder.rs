//! Type-state builder for `TouchEngine`.
//!
//! Channel count and measurements-per-channel must be provided before
//! `build()` is available; `try_build()` is always available for dynamic
//! checks.

use std::marker::PhantomData;
use std::sync::Arc;

use touchsense_traits::NvStore;
use touchsense_traits::clock::{Clock, MonotonicClock};
use touchsense_traits::rng::{Lcg, RandomSource};

use crate::channel::Channel;
use crate::engine::{StateChangeCallback, TouchEngine};
use crate::error::{ConfigError, SensorError};
use crate::scan;
use crate::settings::MAX_CHANNELS;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `TouchEngine`. All fields are validated on build.
pub struct TouchEngineBuilder<C, K> {
    channels: Option<usize>,
    measurements: Option<usize>,
    clock: Option<Arc<dyn Clock>>,
    rng: Option<Box<dyn RandomSource>>,
    scan_order: Option<Vec<u8>>,
    settings_store: Option<Box<dyn NvStore>>,
    settings_offset: usize,
    load_settings: bool,
    callback: Option<StateChangeCallback>,
    channel_cfgs: Vec<touchsense_config::ChannelCfg>,
    _c: PhantomData<C>,
    _k: PhantomData<K>,
}

impl Default for TouchEngineBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            channels: None,
            measurements: None,
            clock: None,
            rng: None,
            scan_order: None,
            settings_store: None,
            settings_offset: 0,
            load_settings: true,
            callback: None,
            channel_cfgs: Vec::new(),
            _c: PhantomData,
            _k: PhantomData,
        }
    }
}

impl<C, K> TouchEngineBuilder<C, K> {
    fn transition<C2, K2>(self) -> TouchEngineBuilder<C2, K2> {
        TouchEngineBuilder {
            channels: self.channels,
            measurements: self.measurements,
            clock: self.clock,
            rng: self.rng,
            scan_order: self.scan_order,
            settings_store: self.settings_store,
            settings_offset: self.settings_offset,
            load_settings: self.load_settings,
            callback: self.callback,
            channel_cfgs: self.channel_cfgs,
            _c: PhantomData,
            _k: PhantomData,
        }
    }

    /// Number of sensing channels (1..=32).
    pub fn with_channels(mut self, n: usize) -> TouchEngineBuilder<Set, K> {
        self.channels = Some(n);
        self.transition()
    }

    /// Measurements taken of each channel per scan (≥ 1).
    pub fn with_measurements_per_channel(mut self, k: usize) -> TouchEngineBuilder<C, Set> {
        self.measurements = Some(k);
        self.transition()
    }

    /// Override the monotonic clock (tests and simulations use `ManualClock`).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the scan-order random source.
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Supply an explicit scan order instead of the generated one. It must
    /// contain every channel index exactly measurements-per-channel times.
    pub fn with_scan_order(mut self, order: Vec<u8>) -> Self {
        self.scan_order = Some(order);
        self
    }

    /// Bind a persistent settings store at `offset`.
    pub fn with_settings_store(mut self, store: Box<dyn NvStore>, offset: usize) -> Self {
        self.settings_store = Some(store);
        self.settings_offset = offset;
        self
    }

    /// Whether to read the settings record during build (default: true).
    /// Integrity failures are recorded on the engine, not returned; channels
    /// keep their compiled-in defaults.
    pub fn load_settings(mut self, load: bool) -> Self {
        self.load_settings = load;
        self
    }

    /// Install the major-state-change callback.
    pub fn with_state_change_callback(mut self, cb: StateChangeCallback) -> Self {
        self.callback = Some(cb);
        self
    }

    /// Take channel count, measurement count and channel tuning from a parsed
    /// config. Channel blocks are overlaid onto the compiled-in defaults
    /// before any stored settings record is applied, so persisted thresholds
    /// win over configured ones.
    pub fn with_config(
        mut self,
        cfg: &touchsense_config::Config,
    ) -> TouchEngineBuilder<Set, Set> {
        self.channels = Some(cfg.engine.channels);
        self.measurements = Some(cfg.engine.measurements_per_channel);
        self.settings_offset = cfg.engine.settings_offset;
        self.load_settings = cfg.engine.load_settings;
        self.channel_cfgs = cfg.channel.clone();
        self.transition()
    }

    /// Dynamic build; fails with `ConfigError` when required fields are
    /// missing or invalid.
    pub fn try_build(self) -> Result<TouchEngine, SensorError> {
        let n = self.channels.ok_or(ConfigError::NoChannels)?;
        if n == 0 {
            return Err(ConfigError::NoChannels.into());
        }
        if n > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels { got: n }.into());
        }
        let k = self.measurements.ok_or(ConfigError::NoMeasurements)?;
        if k == 0 {
            return Err(ConfigError::NoMeasurements.into());
        }

        let scan_order = match self.scan_order {
            Some(order) => {
                scan::validate_scan_order(&order, n, k)?;
                order
            }
            None => {
                let mut rng = self.rng.unwrap_or_else(|| Box::new(Lcg::default()));
                scan::build_scan_order(n, k, rng.as_mut())?
            }
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();

        let mut engine = TouchEngine {
            channels: vec![Channel::default(); n],
            methods: (0..n).map(|_| None).collect(),
            scan_order,
            measurements_per_channel: k,
            any_approached: false,
            any_pressed: false,
            clock,
            epoch,
            callback: self.callback,
            settings_store: self.settings_store,
            settings_offset: self.settings_offset,
            last_error: None,
        };

        for ccfg in &self.channel_cfgs {
            if ccfg.index >= n {
                return Err(ConfigError::ChannelIndexOutOfRange { index: ccfg.index }.into());
            }
            engine.channels[ccfg.index].apply_cfg(ccfg);
        }

        if engine.settings_store.is_some() && self.load_settings {
            // Storage trouble is recorded, never fatal: the engine runs on
            // its compiled-in defaults and the caller decides what to do.
            if let Err(e) = engine.reload_settings() {
                tracing::warn!(error = %e, "stored settings rejected, using defaults");
            }
        }

        Ok(engine)
    }
}

impl TouchEngineBuilder<Set, Set> {
    /// Build the engine; all required fields are present by construction.
    pub fn build(self) -> Result<TouchEngine, SensorError> {
        self.try_build()
    }
}
