use std::path::PathBuf;

use clap::Parser;

/// Simulated multi-pad touch sensing loop for demos and threshold tuning.
#[derive(Parser, Debug)]
#[command(name = "touchsense", version, about)]
pub struct Cli {
    /// TOML config file; overrides --channels and --measurements
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of simulated pads
    #[arg(long, default_value_t = 4)]
    pub channels: usize,

    /// Measurements per channel per scan
    #[arg(long, default_value_t = 8)]
    pub measurements: usize,

    /// Scan period in milliseconds
    #[arg(long, default_value_t = 10)]
    pub period_ms: u64,

    /// Number of scans to run (0 = until Ctrl-C)
    #[arg(long, default_value_t = 600)]
    pub scans: u64,

    /// Settings store image; binds threshold persistence when given
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Settings store size in bytes
    #[arg(long, default_value_t = 1024)]
    pub store_len: usize,

    /// Persist thresholds to the store on exit
    #[arg(long)]
    pub save: bool,

    /// Print per-channel bars every N scans (0 = never)
    #[arg(long, default_value_t = 50)]
    pub bar_every: u64,

    /// Bar width in characters
    #[arg(long, default_value_t = 40)]
    pub bar_width: usize,
}
