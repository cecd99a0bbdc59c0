//! touchsense demo binary: drives the scan engine against simulated pads,
//! logging major state changes and printing tuning bars.

mod cli;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use touchsense_config::Config;
use touchsense_core::{TouchEngine, render};
use touchsense_hardware::{FileStore, PadHandle, SimulatedPad};
use touchsense_traits::clock::{Clock, MonotonicClock};

use crate::cli::Cli;

/// Scans per simulated touch cycle: idle, touch, release.
const TOUCH_CYCLE: u64 = 150;
const TOUCH_START: u64 = 50;
const TOUCH_END: u64 = 100;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_engine(args: &Cli) -> eyre::Result<TouchEngine> {
    let mut builder = TouchEngine::builder();

    if let Some(path) = &args.store {
        let store = FileStore::open(path, args.store_len)
            .wrap_err_with(|| format!("opening settings store {}", path.display()))?;
        builder = builder.with_settings_store(Box::new(store), 0);
    }

    let builder = builder.with_state_change_callback(Box::new(|ch, old, new| {
        tracing::info!(channel = ch, from = %old, to = %new, "state change");
    }));

    let engine = match &args.config {
        Some(path) => {
            let cfg = Config::from_path(path)?;
            builder.with_config(&cfg).build()?
        }
        None => builder
            .with_channels(args.channels)
            .with_measurements_per_channel(args.measurements)
            .build()?,
    };

    Ok(engine)
}

fn attach_pads(engine: &mut TouchEngine) -> Vec<PadHandle> {
    let mut handles = Vec::new();
    for ch in 0..engine.channel_count() {
        let pad = SimulatedPad::new(1000 + 50 * ch as i32, 300);
        handles.push(pad.handle());
        if let Err(e) = engine.initialize(ch, Box::new(pad)) {
            tracing::warn!(channel = ch, error = %e, "pad initialization failed");
        }
    }
    handles
}

/// Touch each pad in turn: pad `i` is held during its slice of every cycle.
fn drive_touches(handles: &[PadHandle], scan: u64) {
    let active = ((scan / TOUCH_CYCLE) as usize) % handles.len();
    let phase = scan % TOUCH_CYCLE;
    for (ch, handle) in handles.iter().enumerate() {
        handle.set_touched(ch == active && (TOUCH_START..TOUCH_END).contains(&phase));
    }
}

fn print_bars(engine: &TouchEngine, width: usize) {
    for ch in 0..engine.channel_count() {
        let bar = render::bar(engine, ch, width).unwrap_or_default();
        println!(
            "ch{ch} {bar} {:>7.1} {}",
            engine.delta(ch),
            engine.state_label(ch)
        );
    }
    println!("scan order: {}", render::scan_order_line(engine));
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = Cli::parse();
    let mut engine = build_engine(&args)?;
    let handles = attach_pads(&mut engine);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .wrap_err("installing Ctrl-C handler")?;
    }

    let clock = MonotonicClock::new();
    let period = Duration::from_millis(args.period_ms);
    let mut scan: u64 = 0;

    tracing::info!(
        channels = engine.channel_count(),
        measurements = engine.measurements_per_channel(),
        period_ms = args.period_ms,
        "scan loop starting"
    );

    while !stop.load(Ordering::SeqCst) && (args.scans == 0 || scan < args.scans) {
        drive_touches(&handles, scan);

        if let Err(e) = engine.run_scan() {
            // Recorded engine errors repeat every scan; keep them out of the
            // hot path at info level.
            tracing::debug!(error = %e, "scan completed with recorded error");
        }

        if args.bar_every > 0 && scan % args.bar_every == 0 {
            print_bars(&engine, args.bar_width);
        }

        scan += 1;
        clock.sleep(period);
    }

    if args.save {
        engine.write_settings().wrap_err("persisting settings")?;
        tracing::info!("settings persisted");
    }

    tracing::info!(scans = scan, "scan loop finished");
    Ok(())
}
