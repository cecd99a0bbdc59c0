#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the touch sensing engine.
//!
//! `Config` and sub-structs are deserialized from TOML and validated. The
//! numeric defaults here intentionally match the engine's compiled-in channel
//! defaults, so a sparse config file only overrides what it mentions.

use serde::Deserialize;
use serde::de::{Deserializer, Error as DeError};

/// Recalibration mask: in TOML either a list of channel indices
/// (`[1, 2]`) or a raw bitmask integer (`6`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskCfg(pub u32);

impl<'de> Deserialize<'de> for MaskCfg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bits(u32),
            Indices(Vec<u8>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bits(bits) => Ok(MaskCfg(bits)),
            Raw::Indices(indices) => {
                let mut mask = 0u32;
                for idx in indices {
                    if idx >= 32 {
                        return Err(D::Error::custom(format!(
                            "mask channel index {idx} out of range (0..32)"
                        )));
                    }
                    mask |= 1 << idx;
                }
                Ok(MaskCfg(mask))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionCfg {
    Negative,
    #[default]
    Positive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleTypeCfg {
    Normal,
    Inverted,
    #[default]
    Differential,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    /// Number of sensing channels (1..=32).
    pub channels: usize,
    /// Measurements taken of each channel per scan.
    pub measurements_per_channel: usize,
    /// Base offset of the settings record in the persistent store.
    pub settings_offset: usize,
    /// Read the stored settings record at startup.
    pub load_settings: bool,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            channels: 1,
            measurements_per_channel: 16,
            settings_offset: 0,
            load_settings: true,
        }
    }
}

/// Per-channel tuning. Field defaults mirror the engine's compiled-in
/// channel defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelCfg {
    /// Channel this block applies to.
    pub index: usize,
    pub pin: Option<u32>,
    pub direction: DirectionCfg,
    pub sample_type: SampleTypeCfg,

    pub released_to_approached_threshold: f32,
    pub approached_to_released_threshold: f32,
    pub approached_to_pressed_threshold: f32,
    pub pressed_to_approached_threshold: f32,

    pub released_to_approached_ms: u64,
    pub approached_to_released_ms: u64,
    pub approached_to_pressed_ms: u64,
    pub pressed_to_approached_ms: u64,

    pub pre_calibration_ms: u64,
    pub calibration_ms: u64,
    /// 0 disables the stuck-approached recalibration timeout.
    pub approached_timeout_ms: u64,
    /// 0 disables the stuck-pressed recalibration timeout.
    pub pressed_timeout_ms: u64,

    pub filter_window: u16,

    pub force_calibration_when_releasing_from_approached: MaskCfg,
    pub force_calibration_when_approaching_from_released: MaskCfg,
    pub force_calibration_when_approaching_from_pressed: MaskCfg,
    pub force_calibration_when_pressing: MaskCfg,

    pub suppress_update_if_any_approached: bool,
    pub suppress_update_if_any_pressed: bool,
    pub enable_slewrate_limiter: bool,
    pub enable_state_machine: bool,
    pub enable_noise_power_measurement: bool,
    pub disabled: bool,

    pub set_offset_manually: bool,
    pub offset_value: f32,
    pub reference_value: f32,
    pub scale_factor: f32,
}

impl Default for ChannelCfg {
    fn default() -> Self {
        Self {
            index: 0,
            pin: None,
            direction: DirectionCfg::default(),
            sample_type: SampleTypeCfg::default(),
            released_to_approached_threshold: 50.0,
            approached_to_released_threshold: 40.0,
            approached_to_pressed_threshold: 150.0,
            pressed_to_approached_threshold: 120.0,
            released_to_approached_ms: 10,
            approached_to_released_ms: 10,
            approached_to_pressed_ms: 10,
            pressed_to_approached_ms: 10,
            pre_calibration_ms: 100,
            calibration_ms: 500,
            approached_timeout_ms: 300_000,
            pressed_timeout_ms: 300_000,
            filter_window: 16,
            force_calibration_when_releasing_from_approached: MaskCfg::default(),
            force_calibration_when_approaching_from_released: MaskCfg::default(),
            force_calibration_when_approaching_from_pressed: MaskCfg::default(),
            force_calibration_when_pressing: MaskCfg::default(),
            suppress_update_if_any_approached: false,
            suppress_update_if_any_pressed: false,
            enable_slewrate_limiter: false,
            enable_state_machine: true,
            enable_noise_power_measurement: false,
            disabled: false,
            set_offset_manually: false,
            offset_value: 0.0,
            reference_value: 0.0,
            scale_factor: 1.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineCfg,
    #[serde(default)]
    pub channel: Vec<ChannelCfg>,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> eyre::Result<Self> {
        let cfg: Self = toml::from_str(s).map_err(|e| eyre::eyre!("config parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML config file.
    pub fn from_path(path: &std::path::Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Structural validation beyond what serde can express.
    pub fn validate(&self) -> eyre::Result<()> {
        let n = self.engine.channels;
        if n == 0 || n > 32 {
            eyre::bail!("engine.channels must be in 1..=32, got {n}");
        }
        if self.engine.measurements_per_channel == 0 {
            eyre::bail!("engine.measurements_per_channel must be at least 1");
        }

        let mut seen = vec![false; n];
        for ch in &self.channel {
            if ch.index >= n {
                eyre::bail!(
                    "channel block index {} out of range for {} channels",
                    ch.index,
                    n
                );
            }
            if seen[ch.index] {
                eyre::bail!("duplicate channel block for index {}", ch.index);
            }
            seen[ch.index] = true;

            for (name, v) in [
                ("released_to_approached_threshold", ch.released_to_approached_threshold),
                ("approached_to_released_threshold", ch.approached_to_released_threshold),
                ("approached_to_pressed_threshold", ch.approached_to_pressed_threshold),
                ("pressed_to_approached_threshold", ch.pressed_to_approached_threshold),
            ] {
                if !v.is_finite() || v < 0.0 {
                    eyre::bail!("channel {}: {name} must be finite and >= 0", ch.index);
                }
            }

            if ch.filter_window < 2 {
                eyre::bail!("channel {}: filter_window must be at least 2", ch.index);
            }
            if !ch.scale_factor.is_finite() || ch.scale_factor == 0.0 {
                eyre::bail!("channel {}: scale_factor must be finite and non-zero", ch.index);
            }

            for (name, mask) in [
                (
                    "force_calibration_when_releasing_from_approached",
                    ch.force_calibration_when_releasing_from_approached,
                ),
                (
                    "force_calibration_when_approaching_from_released",
                    ch.force_calibration_when_approaching_from_released,
                ),
                (
                    "force_calibration_when_approaching_from_pressed",
                    ch.force_calibration_when_approaching_from_pressed,
                ),
                ("force_calibration_when_pressing", ch.force_calibration_when_pressing),
            ] {
                if n < 32 && mask.0 >> n != 0 {
                    eyre::bail!(
                        "channel {}: {name} refers to channels outside 0..{n}",
                        ch.index
                    );
                }
            }
        }

        Ok(())
    }
}
