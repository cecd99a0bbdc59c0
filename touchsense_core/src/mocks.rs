//! Test and helper mocks for touchsense_core.

use std::cell::Cell;
use std::rc::Rc;

use touchsense_traits::NvStore;
use touchsense_traits::store::NV_BLANK;

use crate::channel::Channel;
use crate::method::{HookResult, MethodKind, SampleMethod};

/// In-memory `NvStore` initialized to blank (0xFF), with a write counter for
/// asserting write-minimization.
pub struct MemoryStore {
    data: Vec<u8>,
    pub writes: usize,
}

impl MemoryStore {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![NV_BLANK; len],
            writes: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl NvStore for MemoryStore {
    fn read_byte(&self, addr: usize) -> HookResult<u8> {
        self.data
            .get(addr)
            .copied()
            .ok_or_else(|| format!("read past end of store: {addr}").into())
    }

    fn write_byte(&mut self, addr: usize, b: u8) -> HookResult<()> {
        let cell = self
            .data
            .get_mut(addr)
            .ok_or_else(|| format!("write past end of store: {addr}"))?;
        *cell = b;
        self.writes += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// A pad whose raw level is set from outside through a shared handle; the
/// engine sees it as a normal-only-capable charge-transfer sensor (inverted
/// requests read 0).
pub struct ConstantPad {
    level: Rc<Cell<i32>>,
}

impl ConstantPad {
    pub fn new(level: i32) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
        }
    }

    /// Shared handle for driving the level from a test.
    pub fn handle(&self) -> Rc<Cell<i32>> {
        self.level.clone()
    }
}

impl SampleMethod for ConstantPad {
    fn kind(&self) -> MethodKind {
        MethodKind::ChargeTransfer
    }

    fn setup(&mut self, _channels: &mut [Channel], _ch: usize) -> HookResult<()> {
        Ok(())
    }

    fn sample(&mut self, _channels: &mut [Channel], _ch: usize, inverted: bool) -> HookResult<i32> {
        if inverted {
            Ok(0)
        } else {
            Ok(self.level.get())
        }
    }

    fn post_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        let d = &mut channels[ch];
        d.value = d.raw as f32 * d.scale_factor;
        Ok(())
    }
}

/// A pad that fails on demand, for exercising degraded-scan behavior.
#[derive(Default)]
pub struct FailingPad {
    pub fail_setup: bool,
    pub fail_sample: bool,
}

impl SampleMethod for FailingPad {
    fn setup(&mut self, _channels: &mut [Channel], _ch: usize) -> HookResult<()> {
        if self.fail_setup {
            Err("pad refused setup".into())
        } else {
            Ok(())
        }
    }

    fn sample(&mut self, _channels: &mut [Channel], _ch: usize, _inverted: bool) -> HookResult<i32> {
        if self.fail_sample {
            Err("pad read failed".into())
        } else {
            Ok(0)
        }
    }

    fn post_sample(&mut self, channels: &mut [Channel], ch: usize) -> HookResult<()> {
        let d = &mut channels[ch];
        d.value = d.raw as f32 * d.scale_factor;
        Ok(())
    }
}
