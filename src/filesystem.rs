//! Composes the block device, bitmap allocator, path parser, and the root
//! and directory tables into the POSIX-shaped operations a mounted
//! filesystem needs: getattr, readdir, mkdir, mknod, unlink, read, write,
//! and the open/flush/truncate/rmdir stubs.
//!
//! Every method here opens the image fresh and lets it go out of scope on
//! return (see the crate-level docs on the scoped acquisition rule); no
//! state survives between calls except the image path and block count.

use std::path::{Path, PathBuf};

use crate::bitmap::Bitmap;
use crate::chain;
use crate::device::BlockDevice;
use crate::dir_table::DirTable;
use crate::error::{FsError, FsResult};
use crate::path::ParsedPath;
use crate::root_table::RootTable;

/// What kind of entry a resolved path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Metadata returned by `getattr`, deliberately minimal: every entry shares
/// a fixed mode and uid/gid (see §1 non-goals on permission modeling).
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub kind: EntryKind,
    pub size: u64,
    pub nlink: u32,
}

/// A resolved directory entry name, as returned by `readdir`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

pub struct Filesystem {
    image_path: PathBuf,
    blocks: u64,
}

impl Filesystem {
    pub fn new(image_path: impl Into<PathBuf>, blocks: u64) -> Self {
        Self {
            image_path: image_path.into(),
            blocks,
        }
    }

    fn open(&self) -> FsResult<BlockDevice> {
        BlockDevice::open(&self.image_path, self.blocks)
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn getattr(&self, path: &str) -> FsResult<Stat> {
        let mut dev = self.open()?;

        match ParsedPath::parse(path) {
            ParsedPath::Root => Ok(Stat {
                kind: EntryKind::Directory,
                size: 0,
                nlink: 2,
            }),
            ParsedPath::Directory { dir } => {
                RootTable::new(&mut dev)
                    .find(&dir)?
                    .ok_or(FsError::NotFound)?;
                Ok(Stat {
                    kind: EntryKind::Directory,
                    size: 0,
                    nlink: 2,
                })
            }
            ParsedPath::File { dir, name, ext } => {
                let dir_block = RootTable::new(&mut dev)
                    .find(&dir)?
                    .ok_or(FsError::NotFound)?;
                let (size, _start) = DirTable::new(&mut dev, dir_block)
                    .find(&name, &ext)?
                    .ok_or(FsError::NotFound)?;
                Ok(Stat {
                    kind: EntryKind::File,
                    size,
                    nlink: 1,
                })
            }
            ParsedPath::Malformed => Err(FsError::NotFound),
        }
    }

    pub fn readdir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let mut dev = self.open()?;

        let names: Vec<DirEntry> = match ParsedPath::parse(path) {
            ParsedPath::Root => RootTable::new(&mut dev)
                .list()?
                .into_iter()
                .map(|(name, _block)| DirEntry {
                    name,
                    kind: EntryKind::Directory,
                })
                .collect(),
            ParsedPath::Directory { dir } => {
                let dir_block = RootTable::new(&mut dev)
                    .find(&dir)?
                    .ok_or(FsError::NotFound)?;
                DirTable::new(&mut dev, dir_block)
                    .list()?
                    .into_iter()
                    .filter(|(name, _, _, _)| !name.is_empty())
                    .map(|(name, ext, _size, _start)| DirEntry {
                        name: format!("{name}.{ext}"),
                        kind: EntryKind::File,
                    })
                    .collect()
            }
            ParsedPath::File { .. } | ParsedPath::Malformed => return Err(FsError::NotFound),
        };

        let mut entries = vec![
            DirEntry {
                name: ".".to_string(),
                kind: EntryKind::Directory,
            },
            DirEntry {
                name: "..".to_string(),
                kind: EntryKind::Directory,
            },
        ];
        entries.extend(names);
        Ok(entries)
    }

    pub fn mkdir(&self, path: &str) -> FsResult<()> {
        let mut dev = self.open()?;
        let target = ParsedPath::parse_for_mkdir(path)?;

        if RootTable::new(&mut dev).find(&target.dir)?.is_some() {
            return Err(FsError::Exists);
        }

        let new_block = Bitmap::new(&mut dev).allocate()?;
        dev.write_block(new_block, &[0u8; crate::param::BLOCK_SIZE])?;

        RootTable::new(&mut dev).insert(&target.dir, new_block)?;

        Ok(())
    }

    pub fn mknod(&self, path: &str) -> FsResult<()> {
        let mut dev = self.open()?;
        let target = ParsedPath::parse_for_mknod(path)?;

        let dir_block = RootTable::new(&mut dev)
            .find(&target.dir)?
            .ok_or(FsError::NotFound)?;

        if DirTable::new(&mut dev, dir_block)
            .find(&target.name, &target.ext)?
            .is_some()
        {
            return Err(FsError::Exists);
        }

        let new_block = Bitmap::new(&mut dev).allocate()?;
        dev.write_block(new_block, &[0u8; crate::param::BLOCK_SIZE])?;

        DirTable::new(&mut dev, dir_block).insert(&target.name, &target.ext, new_block)?;

        Ok(())
    }

    pub fn unlink(&self, path: &str) -> FsResult<()> {
        let mut dev = self.open()?;

        let (dir, name, ext) = match ParsedPath::parse(path) {
            ParsedPath::File { dir, name, ext } => (dir, name, ext),
            ParsedPath::Directory { .. } => return Err(FsError::IsDirectory),
            ParsedPath::Root | ParsedPath::Malformed => return Err(FsError::NotFound),
        };

        let dir_block = RootTable::new(&mut dev)
            .find(&dir)?
            .ok_or(FsError::NotFound)?;
        let (_size, start) = DirTable::new(&mut dev, dir_block)
            .find(&name, &ext)?
            .ok_or(FsError::NotFound)?;

        chain::free_chain(&mut dev, start)?;
        DirTable::new(&mut dev, dir_block).remove(&name, &ext)?;

        Ok(())
    }

    pub fn read(&self, path: &str, size: u64, offset: u64) -> FsResult<Vec<u8>> {
        let mut dev = self.open()?;

        let (dir, name, ext) = match ParsedPath::parse(path) {
            ParsedPath::File { dir, name, ext } => (dir, name, ext),
            ParsedPath::Directory { .. } | ParsedPath::Root => return Err(FsError::IsDirectory),
            ParsedPath::Malformed => return Err(FsError::NotFound),
        };

        let dir_block = RootTable::new(&mut dev)
            .find(&dir)?
            .ok_or(FsError::NotFound)?;
        let (file_size, start) = DirTable::new(&mut dev, dir_block)
            .find(&name, &ext)?
            .ok_or(FsError::NotFound)?;

        if size == 0 {
            return Ok(Vec::new());
        }

        chain::read(&mut dev, start, file_size, offset, size)
    }

    pub fn write(&self, path: &str, bytes: &[u8], offset: u64) -> FsResult<usize> {
        let mut dev = self.open()?;

        let (dir, name, ext) = match ParsedPath::parse(path) {
            ParsedPath::File { dir, name, ext } => (dir, name, ext),
            ParsedPath::Directory { .. } | ParsedPath::Root => return Err(FsError::IsDirectory),
            ParsedPath::Malformed => return Err(FsError::NotFound),
        };

        if bytes.is_empty() {
            return Ok(0);
        }

        let dir_block = RootTable::new(&mut dev)
            .find(&dir)?
            .ok_or(FsError::NotFound)?;
        let (current_size, start) = DirTable::new(&mut dev, dir_block)
            .find(&name, &ext)?
            .ok_or(FsError::NotFound)?;

        if offset > current_size {
            return Err(FsError::FileTooBig);
        }

        let written = chain::write(&mut dev, start, offset, bytes)?;

        let new_size = current_size.max(offset + written as u64);
        DirTable::new(&mut dev, dir_block).update_size(&name, &ext, new_size)?;

        Ok(written)
    }

    /// Stub: the real file-size bookkeeping happens in `mknod`/`write`.
    /// Shrinking an existing file is out of scope (see §1 non-goals).
    pub fn truncate(&self, _path: &str, _new_size: u64) -> FsResult<()> {
        Ok(())
    }

    /// Stub: every handler reopens the image, so there is no per-open state
    /// to set up.
    pub fn open_file(&self, _path: &str) -> FsResult<()> {
        Ok(())
    }

    /// Stub: writes are already durable (`sync_data` on every block write),
    /// so there is nothing left to flush.
    pub fn flush(&self, _path: &str) -> FsResult<()> {
        Ok(())
    }

    /// Stub: directory blocks are never deallocated in this design (see the
    /// design notes on reclamation).
    pub fn rmdir(&self, _path: &str) -> FsResult<()> {
        Ok(())
    }
}
