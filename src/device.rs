//! Seeks and reads/writes fixed 512-byte blocks against the backing image file.
//!
//! A [`BlockDevice`] is opened fresh at the start of every request handler
//! and dropped at the end of it (see the crate-level docs on the scoped
//! acquisition rule) — there is no block cache here, unlike a kernel buffer
//! cache, because there is exactly one handler in flight at a time and
//! nothing to amortize a cache against.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{FsError, FsResult};
use crate::param::BLOCK_SIZE;

pub struct BlockDevice {
    file: File,
    /// Number of 512-byte blocks in the data region (excludes the bitmap).
    blocks: u64,
}

impl BlockDevice {
    /// Opens `path` read/write and validates its length against `blocks`.
    ///
    /// The image must be exactly `blocks * BLOCK_SIZE + blocks` bytes: the
    /// data region plus a one-byte-per-block bitmap at the tail.
    pub fn open(path: &Path, blocks: u64) -> FsResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let expected = blocks * BLOCK_SIZE as u64 + blocks;
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("image is {actual} bytes, expected {expected} for {blocks} blocks"),
            )));
        }

        Ok(Self { file, blocks })
    }

    pub fn block_count(&self) -> u64 {
        self.blocks
    }

    /// Byte offset of the start of the bitmap region, one byte per block.
    pub fn bitmap_offset(&self) -> u64 {
        self.blocks * BLOCK_SIZE as u64
    }

    pub fn bitmap_len(&self) -> u64 {
        self.blocks
    }

    /// Reads block `n` in full.
    pub fn read_block(&mut self, n: u64) -> FsResult<[u8; BLOCK_SIZE]> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.read_at(n * BLOCK_SIZE as u64, &mut buf)?;
        Ok(buf)
    }

    /// Writes block `n` in full and flushes before returning.
    pub fn write_block(&mut self, n: u64, data: &[u8; BLOCK_SIZE]) -> FsResult<()> {
        self.write_at(n * BLOCK_SIZE as u64, data)
    }

    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> FsResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> FsResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.file.sync_data()?;
        Ok(())
    }
}
