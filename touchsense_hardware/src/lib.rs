#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Host-side implementations of the touchsense hardware seams: a file-backed
//! settings store and a simulated capacitive pad for demos and tuning without
//! real electrodes.

pub mod error;

use std::cell::Cell;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;

use touchsense_core::channel::Channel;
use touchsense_core::method::{HookResult, MethodKind, SampleMethod};
use touchsense_traits::NvStore;
use touchsense_traits::rng::{Lcg, RandomSource};
use touchsense_traits::store::NV_BLANK;

use crate::error::HwError;

/// An EEPROM image backed by a file: reads come from an in-memory copy,
/// writes go through to disk immediately, byte by byte, like the real part.
pub struct FileStore {
    file: File,
    image: Vec<u8>,
}

impl FileStore {
    /// Open (or create) a store of `len` bytes at `path`. A shorter existing
    /// file is padded with blank bytes, preserving its current content.
    pub fn open(path: &Path, len: usize) -> Result<Self, HwError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut image = Vec::with_capacity(len);
        file.read_to_end(&mut image)?;
        if image.len() < len {
            let pad = len - image.len();
            image.extend(std::iter::repeat_n(NV_BLANK, pad));
            file.seek(SeekFrom::End(0))?;
            file.write_all(&vec![NV_BLANK; pad])?;
        } else {
            image.truncate(len);
        }

        tracing::debug!(path = %path.display(), len, "settings store opened");
        Ok(Self { file, image })
    }
}

impl NvStore for FileStore {
    fn read_byte(&self, addr: usize) -> Result<u8, Box<dyn Error + Send + Sync>> {
        self.image
            .get(addr)
            .copied()
            .ok_or_else(|| {
                Box::new(HwError::OutOfRange {
                    addr,
                    len: self.image.len(),
                }) as Box<dyn Error + Send + Sync>
            })
    }

    fn write_byte(&mut self, addr: usize, b: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        if addr >= self.image.len() {
            return Err(Box::new(HwError::OutOfRange {
                addr,
                len: self.image.len(),
            }));
        }
        self.file.seek(SeekFrom::Start(addr as u64))?;
        self.file.write_all(&[b])?;
        self.image[addr] = b;
        Ok(())
    }

    fn len(&self) -> usize {
        self.image.len()
    }
}

/// Shared control handle for a [`SimulatedPad`].
#[derive(Clone)]
pub struct PadHandle {
    touched: Rc<Cell<bool>>,
}

impl PadHandle {
    pub fn set_touched(&self, touched: bool) {
        self.touched.set(touched);
    }

    pub fn is_touched(&self) -> bool {
        self.touched.get()
    }
}

/// Simulated charge-transfer pad: a stable baseline, a touch-induced offset
/// and a little deterministic jitter.
pub struct SimulatedPad {
    baseline: i32,
    touch_delta: i32,
    jitter: i32,
    rng: Lcg,
    touched: Rc<Cell<bool>>,
}

impl SimulatedPad {
    pub fn new(baseline: i32, touch_delta: i32) -> Self {
        Self {
            baseline,
            touch_delta,
            jitter: 2,
            rng: Lcg::new(baseline as u32),
            touched: Rc::new(Cell::new(false)),
        }
    }

    /// Peak-to-peak jitter added to every reading.
    pub fn with_jitter(mut self, jitter: i32) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn handle(&self) -> PadHandle {
        PadHandle {
            touched: self.touched.clone(),
        }
    }
}

impl SampleMethod for SimulatedPad {
    fn kind(&self) -> MethodKind {
        MethodKind::ChargeTransfer
    }

    fn setup(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        let d = &mut channels[ch];
        // Sensible bar scale for tuning output.
        if d.calibrated_max_delta == 0.0 {
            d.calibrated_max_delta = self.touch_delta as f32;
        }
        Ok(())
    }

    fn sample(&mut self, _channels: &mut [Channel], _ch: usize, inverted: bool) -> HookResult<i32> {
        if inverted {
            // Pseudo-differential inversion is not simulated.
            return Ok(0);
        }
        let mut level = self.baseline;
        if self.touched.get() {
            level += self.touch_delta;
        }
        if self.jitter > 0 {
            level += self.rng.next_below(self.jitter as u32 + 1) as i32 - self.jitter / 2;
        }
        Ok(level)
    }

    fn post_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        let d = &mut channels[ch];
        d.value = d.raw as f32 * d.scale_factor;
        Ok(())
    }
}
