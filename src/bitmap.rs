//! Free/used status for every block, stored one byte per block in the
//! trailing region of the image.
//!
//! Allocation always returns the lowest free block, keeping files clustered
//! near each other and making the allocator deterministic for tests.

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};

pub struct Bitmap<'a> {
    dev: &'a mut BlockDevice,
}

impl<'a> Bitmap<'a> {
    pub fn new(dev: &'a mut BlockDevice) -> Self {
        Self { dev }
    }

    fn read_region(&mut self) -> FsResult<Vec<u8>> {
        let mut buf = vec![0u8; self.dev.bitmap_len() as usize];
        self.dev.read_at(self.dev.bitmap_offset(), &mut buf)?;
        Ok(buf)
    }

    fn write_region(&mut self, region: &[u8]) -> FsResult<()> {
        self.dev.write_at(self.dev.bitmap_offset(), region)
    }

    /// Returns whether `block` is currently marked used.
    pub fn is_used(&mut self, block: u64) -> FsResult<bool> {
        let region = self.read_region()?;
        Ok(region[block as usize] != 0)
    }

    /// Scans from block 1 upward (block 0 is the root block and is always
    /// used) and returns the lowest free block, marking it used.
    pub fn allocate(&mut self) -> FsResult<u64> {
        let mut region = self.read_region()?;

        for (i, used) in region.iter_mut().enumerate().skip(1) {
            if *used == 0 {
                *used = 1;
                self.write_region(&region)?;
                return Ok(i as u64);
            }
        }

        Err(FsError::NoSpace)
    }

    /// Marks `block` free again.
    pub fn release(&mut self, block: u64) -> FsResult<()> {
        let mut region = self.read_region()?;
        region[block as usize] = 0;
        self.write_region(&region)
    }
}
