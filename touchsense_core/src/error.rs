use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("engine needs at least one channel")]
    NoChannels,
    #[error("engine needs at least one measurement per channel")]
    NoMeasurements,
    #[error("channel count {got} exceeds the 32-channel recalibration mask limit")]
    TooManyChannels { got: usize },
    #[error("custom scan order rejected: {0}")]
    BadScanOrder(&'static str),
    #[error("channel config block index {index} out of range")]
    ChannelIndexOutOfRange { index: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("channel count {got} does not fit the settings record header")]
    TooManyChannels { got: usize },
    #[error("settings record needs {needed} bytes but store holds {available}")]
    Capacity { needed: usize, available: usize },
    #[error("settings key mismatch: found {found:#04x}")]
    KeyMismatch { found: u8 },
    #[error("settings format version mismatch: found {found}")]
    VersionMismatch { found: u8 },
    #[error("settings channel count mismatch: found {found}, expected {expected}")]
    ChannelCountMismatch { found: usize, expected: usize },
    #[error("settings checksum mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    CrcMismatch { stored: u16, computed: u16 },
    #[error("settings backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sample method setup failed for channel {channel}: {reason}")]
    SampleSetup { channel: usize, reason: String },
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("scan order ran out of empty slots")]
    ScanOrderOverflow,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
