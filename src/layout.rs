//! Byte-exact encode/decode routines for the three on-disk record types.
//!
//! Every record is read and written through explicit byte-slice routines
//! rather than `#[repr(C)]` pointer reinterpretation of a live buffer: the
//! format must stay padding-free independent of whatever layout the
//! compiler would otherwise pick for a mixed-alignment struct, and a plain
//! byte-slice walk sidesteps any alignment hazard entirely.

use crate::error::{FsError, FsResult};
use crate::param::{
    BLOCK_SIZE, DATA_PER_BLOCK, DIRS_IN_ROOT, DIR_DESCRIPTOR_SIZE, FILES_IN_DIR,
    FILE_DESCRIPTOR_SIZE, MAX_EXT, MAX_NAME,
};

fn encode_name(name: &str, width: usize, buf: &mut [u8]) {
    debug_assert!(name.len() < width);
    buf[..name.len()].copy_from_slice(name.as_bytes());
}

fn decode_name(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// A subdirectory entry in the root block: its name and the byte offset of
/// its first (and only) directory block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirDescriptor {
    pub name: String,
    pub start_offset: u64,
}

/// A file entry in a directory block: its (name, ext), size in bytes, and
/// the byte offset of the first block of its data chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub start_offset: u64,
}

/// Decoded contents of the root block (block 0).
#[derive(Debug, Clone, Default)]
pub struct RootBlock {
    pub dirs: Vec<DirDescriptor>,
}

impl RootBlock {
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> FsResult<Self> {
        let n = u32::from_ne_bytes(buf[0..4].try_into().unwrap()) as usize;
        if n > DIRS_IN_ROOT {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "root block reports more directories than fit",
            )));
        }

        let mut dirs = Vec::with_capacity(n);
        for i in 0..n {
            let off = 4 + i * DIR_DESCRIPTOR_SIZE;
            let name = decode_name(&buf[off..off + MAX_NAME + 1]);
            let start_off = off + MAX_NAME + 1;
            let start_offset =
                u64::from_ne_bytes(buf[start_off..start_off + 8].try_into().unwrap());
            dirs.push(DirDescriptor { name, start_offset });
        }

        Ok(Self { dirs })
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&(self.dirs.len() as u32).to_ne_bytes());

        for (i, d) in self.dirs.iter().enumerate() {
            let off = 4 + i * DIR_DESCRIPTOR_SIZE;
            encode_name(&d.name, MAX_NAME + 1, &mut buf[off..off + MAX_NAME + 1]);
            let start_off = off + MAX_NAME + 1;
            buf[start_off..start_off + 8].copy_from_slice(&d.start_offset.to_ne_bytes());
        }

        buf
    }
}

/// Decoded contents of a directory block.
#[derive(Debug, Clone, Default)]
pub struct DirectoryBlock {
    pub files: Vec<FileDescriptor>,
}

impl DirectoryBlock {
    pub fn decode(buf: &[u8; BLOCK_SIZE]) -> FsResult<Self> {
        let n = u32::from_ne_bytes(buf[0..4].try_into().unwrap()) as usize;
        if n > FILES_IN_DIR {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "directory block reports more files than fit",
            )));
        }

        let mut files = Vec::with_capacity(n);
        for i in 0..n {
            let off = 4 + i * FILE_DESCRIPTOR_SIZE;
            let name = decode_name(&buf[off..off + MAX_NAME + 1]);
            let ext_off = off + MAX_NAME + 1;
            let ext = decode_name(&buf[ext_off..ext_off + MAX_EXT + 1]);
            let size_off = ext_off + MAX_EXT + 1;
            let size = u64::from_ne_bytes(buf[size_off..size_off + 8].try_into().unwrap());
            let start_off = size_off + 8;
            let start_offset =
                u64::from_ne_bytes(buf[start_off..start_off + 8].try_into().unwrap());
            files.push(FileDescriptor {
                name,
                ext,
                size,
                start_offset,
            });
        }

        Ok(Self { files })
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&(self.files.len() as u32).to_ne_bytes());

        for (i, f) in self.files.iter().enumerate() {
            let off = 4 + i * FILE_DESCRIPTOR_SIZE;
            encode_name(&f.name, MAX_NAME + 1, &mut buf[off..off + MAX_NAME + 1]);
            let ext_off = off + MAX_NAME + 1;
            encode_name(&f.ext, MAX_EXT + 1, &mut buf[ext_off..ext_off + MAX_EXT + 1]);
            let size_off = ext_off + MAX_EXT + 1;
            buf[size_off..size_off + 8].copy_from_slice(&f.size.to_ne_bytes());
            let start_off = size_off + 8;
            buf[start_off..start_off + 8].copy_from_slice(&f.start_offset.to_ne_bytes());
        }

        buf
    }
}

/// A data block: an 8-byte `nextBlock` byte offset (0 = end of chain)
/// followed by [`DATA_PER_BLOCK`] bytes of payload.
pub struct DataBlock;

impl DataBlock {
    pub fn next_block(buf: &[u8; BLOCK_SIZE]) -> u64 {
        u64::from_ne_bytes(buf[0..8].try_into().unwrap())
    }

    pub fn set_next_block(buf: &mut [u8; BLOCK_SIZE], next: u64) {
        buf[0..8].copy_from_slice(&next.to_ne_bytes());
    }

    pub fn payload(buf: &[u8; BLOCK_SIZE]) -> &[u8] {
        &buf[8..8 + DATA_PER_BLOCK]
    }

    pub fn payload_mut(buf: &mut [u8; BLOCK_SIZE]) -> &mut [u8] {
        &mut buf[8..8 + DATA_PER_BLOCK]
    }
}

/// Converts a block index to the byte-offset encoding stored on disk
/// (`original_source`'s `nStartBlock = blockIndex * 512`).
pub fn block_to_offset(block: u64) -> u64 {
    block * BLOCK_SIZE as u64
}

/// Inverse of [`block_to_offset`].
pub fn offset_to_block(offset: u64) -> u64 {
    offset / BLOCK_SIZE as u64
}
