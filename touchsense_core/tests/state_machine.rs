use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use touchsense_core::mocks::ConstantPad;
use touchsense_core::{ButtonState, TouchEngine};
use touchsense_traits::clock::ManualClock;

const SCAN_PERIOD_MS: u64 = 10;

struct Rig {
    engine: TouchEngine,
    clock: ManualClock,
    levels: Vec<Rc<Cell<i32>>>,
    events: Rc<RefCell<Vec<(usize, ButtonState, ButtonState)>>>,
}

impl Rig {
    /// Two channels on a 100-baseline with tight thresholds (5/4/15/12) and
    /// 10 ms transition dwells.
    fn new() -> Self {
        let clock = ManualClock::new();
        let events: Rc<RefCell<Vec<(usize, ButtonState, ButtonState)>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();

        let mut engine = TouchEngine::builder()
            .with_channels(2)
            .with_measurements_per_channel(1)
            .with_clock(Arc::new(clock.clone()))
            .with_state_change_callback(Box::new(move |ch, old, new| {
                sink.borrow_mut().push((ch, old, new));
            }))
            .build()
            .unwrap();

        let mut levels = Vec::new();
        for ch in 0..2 {
            let pad = ConstantPad::new(100);
            levels.push(pad.handle());
            engine.initialize(ch, Box::new(pad)).unwrap();

            let d = engine.channel_mut(ch);
            d.released_to_approached_threshold = 5.0;
            d.approached_to_released_threshold = 4.0;
            d.approached_to_pressed_threshold = 15.0;
            d.pressed_to_approached_threshold = 12.0;
        }

        Self {
            engine,
            clock,
            levels,
            events,
        }
    }

    fn scan(&mut self) {
        self.clock.advance_ms(SCAN_PERIOD_MS);
        self.engine.run_scan().unwrap();
    }

    fn settle_released(&mut self) {
        for _ in 0..100 {
            if self.engine.state(0) == ButtonState::Released
                && self.engine.state(1) == ButtonState::Released
            {
                self.events.borrow_mut().clear();
                return;
            }
            self.scan();
        }
        panic!("channels never settled in Released");
    }

    fn press(&mut self, ch: usize) {
        self.levels[ch].set(200);
        for _ in 0..10 {
            if self.engine.state(ch) == ButtonState::Pressed {
                return;
            }
            self.scan();
        }
        panic!("channel {ch} never reached Pressed");
    }
}

#[test]
fn pressing_walks_through_both_dwell_states() {
    let mut rig = Rig::new();
    rig.settle_released();

    rig.levels[0].set(200);
    let mut seen = Vec::new();
    for _ in 0..6 {
        rig.scan();
        seen.push(rig.engine.state(0));
    }
    assert_eq!(
        &seen[..4],
        &[
            ButtonState::ReleasedToApproached,
            ButtonState::Approached,
            ButtonState::ApproachedToPressed,
            ButtonState::Pressed,
        ]
    );
}

#[test]
fn forced_recalibration_mask_drives_other_channel_to_precalibrating() {
    let mut rig = Rig::new();
    rig.engine
        .channel_mut(0)
        .force_calibration_when_pressing = 1 << 1;
    rig.settle_released();

    rig.press(0);

    assert_eq!(rig.engine.state(1), ButtonState::PreCalibrating);
    assert!(rig.engine.channel(1).forced_cal);
    // Entering PreCalibrating is always a major change.
    assert!(
        rig.events
            .borrow()
            .iter()
            .any(|&(ch, old, new)| ch == 1
                && old == ButtonState::Released
                && new == ButtonState::PreCalibrating)
    );
}

#[test]
fn self_targeting_mask_overrides_the_nominal_destination() {
    let mut rig = Rig::new();
    rig.engine
        .channel_mut(0)
        .force_calibration_when_pressing = 1 << 0;
    rig.settle_released();

    rig.levels[0].set(200);
    for _ in 0..10 {
        rig.scan();
        if rig.engine.state(0) == ButtonState::PreCalibrating {
            break;
        }
    }

    // The channel never lands in Pressed: the mask wins.
    assert_eq!(rig.engine.state(0), ButtonState::PreCalibrating);
    assert!(rig.engine.channel(0).forced_cal);
    assert!(
        rig.events
            .borrow()
            .iter()
            .any(|&(ch, old, new)| ch == 0
                && old == ButtonState::ApproachedToPressed
                && new == ButtonState::PreCalibrating)
    );
}

#[test]
fn reverting_from_pressed_to_approached_keeps_the_entry_timestamp() {
    let mut rig = Rig::new();
    rig.settle_released();
    rig.press(0);

    // Dip below the press threshold for one scan...
    rig.levels[0].set(110);
    rig.scan();
    assert_eq!(rig.engine.state(0), ButtonState::PressedToApproached);
    let entered_pta_at = rig.engine.channel(0).state_changed_at_ms;

    // ...then rise again: back to Pressed without a timestamp refresh, so the
    // flap cannot stall the periodic recalibration timeout.
    rig.levels[0].set(200);
    rig.scan();
    assert_eq!(rig.engine.state(0), ButtonState::Pressed);
    assert_eq!(rig.engine.channel(0).state_changed_at_ms, entered_pta_at);
}

#[test]
fn pressed_timeout_forces_recalibration() {
    let mut rig = Rig::new();
    rig.engine.channel_mut(0).pressed_timeout_ms = 100;
    rig.settle_released();
    rig.press(0);

    for _ in 0..12 {
        rig.scan();
    }
    // 120 ms pressed > 100 ms timeout: the channel recalibrates itself.
    assert!(rig.engine.is_calibrating(0));
}

#[test]
fn approached_timeout_forces_recalibration() {
    let mut rig = Rig::new();
    rig.engine.channel_mut(0).approached_timeout_ms = 100;
    rig.settle_released();

    // Delta of 10 sits between approach (5) and press (15) thresholds.
    rig.levels[0].set(110);
    for _ in 0..3 {
        rig.scan();
    }
    assert_eq!(rig.engine.state(0), ButtonState::Approached);

    for _ in 0..12 {
        rig.scan();
    }
    assert!(rig.engine.is_calibrating(0));
}

#[test]
fn zero_timeout_disables_forced_recalibration() {
    let mut rig = Rig::new();
    rig.engine.channel_mut(0).pressed_timeout_ms = 0;
    rig.settle_released();
    rig.press(0);

    for _ in 0..50 {
        rig.scan();
    }
    assert_eq!(rig.engine.state(0), ButtonState::Pressed);
}

#[test]
fn disabled_state_machine_parks_in_released() {
    let mut rig = Rig::new();
    rig.engine.channel_mut(0).enable_state_machine = false;
    rig.settle_released();

    rig.levels[0].set(200);
    for _ in 0..10 {
        rig.scan();
    }
    // Delta is live for plain sensing, but no transitions happen.
    assert_eq!(rig.engine.state(0), ButtonState::Released);
    assert!(rig.engine.delta(0) > 5.0);
}

#[test]
fn recalibration_resets_statistics_and_converges_on_the_new_baseline() {
    let mut rig = Rig::new();
    rig.engine.channel_mut(0).approached_timeout_ms = 50;
    rig.settle_released();

    let old_max_delta = rig.engine.max_delta(0);

    // Drift to a new baseline that reads as "approached" forever.
    rig.levels[0].set(110);
    for _ in 0..10 {
        rig.scan();
    }
    assert!(rig.engine.is_calibrating(0));
    assert!(rig.engine.max_delta(0) <= old_max_delta.max(0.0));

    for _ in 0..100 {
        rig.scan();
        if rig.engine.state(0) == ButtonState::Released {
            break;
        }
    }
    assert_eq!(rig.engine.state(0), ButtonState::Released);
    assert_eq!(rig.engine.avg(0), 110.0);
    assert!(rig.engine.delta(0).abs() < 1e-3);
}

#[test]
fn out_of_band_recalibration_hits_every_masked_channel() {
    let mut rig = Rig::new();
    rig.settle_released();

    rig.engine.force_recalibrate(0b11);

    for ch in 0..2 {
        assert_eq!(rig.engine.state(ch), ButtonState::PreCalibrating);
        assert!(rig.engine.channel(ch).forced_cal);
    }
    // Both channels walk calibration again and settle back.
    rig.settle_released();
}

#[test]
fn major_change_callback_skips_dwell_churn() {
    let mut rig = Rig::new();
    rig.settle_released();
    rig.press(0);

    let events = rig.events.borrow().clone();
    // Only the two settled arrivals are reported, none of the dwell states.
    assert_eq!(
        events
            .iter()
            .filter(|&&(ch, _, _)| ch == 0)
            .map(|&(_, _, new)| new)
            .collect::<Vec<_>>(),
        vec![ButtonState::Approached, ButtonState::Pressed]
    );
}
