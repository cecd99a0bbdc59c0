#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Multi-channel touch sensing engine (hardware-agnostic).
//!
//! Turns noisy, repeated raw readings from any number of sensing channels
//! into debounced, hysteresis-stable touch events. All hardware interaction
//! goes through `touchsense_traits` (clock, persistent store, random source)
//! and the per-channel [`SampleMethod`] bound at initialization.
//!
//! ## Architecture
//!
//! - **Scan order**: reproducible pseudo-random interleaving (`scan` module)
//! - **Filtering**: saturating running average and noise power (`filter`)
//! - **State machine**: the 10-state touch/approach/press lifecycle (`engine`)
//! - **Settings**: CRC-protected threshold persistence (`settings`)
//! - **Rendering**: tuning bars and scan-order dumps (`render`)
//!
//! ## Driving it
//!
//! Build a [`TouchEngine`], bind a sample method per channel with
//! `initialize`, then call `run_scan` once per control-loop tick. Each scan
//! measures every channel `measurements_per_channel` times, advances every
//! state machine once, and refreshes the summary flags.

pub mod builder;
pub mod channel;
pub mod engine;
pub mod error;
pub mod method;
pub mod mocks;
pub mod render;
pub mod scan;
pub mod settings;
pub mod state;

mod conversions;
mod filter;

pub use builder::TouchEngineBuilder;
pub use channel::{Channel, Direction, SampleType};
pub use engine::{StateChangeCallback, TouchEngine};
pub use error::{ConfigError, SensorError, SettingsError};
pub use method::{FnSampleMethod, HookResult, MethodKind, SampleMethod};
pub use state::ButtonState;
