//! Human-readable tuning output: delta bars and the scan-order dump.
//!
//! Pure string builders; routing them to a serial port, log line or terminal
//! is the caller's business.

use crate::channel::Channel;
use crate::engine::TouchEngine;
use crate::method::MethodKind;

/// Find the other channel sharing this channel's pin, if any. Sensor pairs
/// (e.g. resistive and capacitive sampling of one electrode) render into a
/// single combined bar.
pub fn find_sensor_pair(channels: &[Channel], ch: usize) -> Option<usize> {
    let pin = channels[ch].pin?;
    let n = channels.len();
    (1..n)
        .map(|step| (ch + step) % n)
        .find(|&other| channels[other].pin == Some(pin))
}

/// Render channel `ch` (and its sensor pair, when present) as a bar of
/// exactly `length` characters, bounded by `|`. Resistive methods fill with
/// `=`/`#`, everything else with `-`/`*`. Returns `None` when `length` cannot
/// hold the two border characters.
pub fn bar(engine: &TouchEngine, ch: usize, length: usize) -> Option<String> {
    if length < 2 {
        return None;
    }
    let bar_len = length - 2;
    let channels = engine.channels();

    let mut hashes: Option<usize> = None;
    let mut dashes: Option<usize> = None;
    {
        let mut assign = |kind: MethodKind, cells: usize| match kind {
            MethodKind::Resistive => hashes = Some(cells.min(bar_len)),
            _ => dashes = Some(cells.min(bar_len)),
        };

        if let Some(pair) = find_sensor_pair(channels, ch) {
            if let Some(m) = engine.method(pair) {
                assign(m.kind(), m.map_delta(channels, pair, bar_len));
            }
        }
        if let Some(m) = engine.method(ch) {
            assign(m.kind(), m.map_delta(channels, ch, bar_len));
        }
    }

    let mut s = String::with_capacity(length);
    s.push('|');
    let mut filled = 0usize;

    if let Some(h) = hashes {
        if h > 0 {
            for _ in 0..h - 1 {
                s.push('=');
            }
            s.push('#');
            filled = h;
        }
    }
    if let Some(d) = dashes {
        if d > filled {
            for _ in filled..d - 1 {
                s.push('-');
            }
            s.push('*');
            filled = d;
        }
    }
    for _ in filled..bar_len {
        s.push(' ');
    }
    s.push('|');

    Some(s)
}

/// The scan order as a space-separated line of channel indices.
pub fn scan_order_line(engine: &TouchEngine) -> String {
    let mut s = String::new();
    for (i, ch) in engine.scan_order().iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push_str(&ch.to_string());
    }
    s
}
