use std::error::Error;

/// Byte value an erased/unwritten non-volatile cell reads back as.
pub const NV_BLANK: u8 = 0xFF;

/// Random-access persistent byte store (EEPROM, flash page, backing file).
///
/// Addresses are store-relative; callers add their own base offset. Writes of
/// a byte that is already present should be skipped by `update_byte` to spare
/// wear-limited media.
pub trait NvStore {
    fn read_byte(&self, addr: usize) -> Result<u8, Box<dyn Error + Send + Sync>>;
    fn write_byte(&mut self, addr: usize, b: u8) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Total store capacity in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `b` only if the stored byte differs.
    fn update_byte(&mut self, addr: usize, b: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.read_byte(addr)? != b {
            self.write_byte(addr, b)?;
        }
        Ok(())
    }
}
