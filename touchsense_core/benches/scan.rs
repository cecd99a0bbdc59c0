use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use touchsense_core::TouchEngine;
use touchsense_core::mocks::ConstantPad;
use touchsense_traits::clock::ManualClock;

fn full_scan(c: &mut Criterion) {
    let clock = ManualClock::new();
    let mut engine = TouchEngine::builder()
        .with_channels(16)
        .with_measurements_per_channel(16)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    for ch in 0..16 {
        engine.initialize(ch, Box::new(ConstantPad::new(100))).unwrap();
    }

    c.bench_function("scan_16ch_16meas", |b| {
        b.iter(|| {
            clock.advance_ms(10);
            engine.run_scan().unwrap();
        })
    });
}

criterion_group!(benches, full_scan);
criterion_main!(benches);
