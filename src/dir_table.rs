//! Reads and writes a directory block: the ordered list of file entries
//! belonging to one subdirectory.

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::layout::{block_to_offset, offset_to_block, DirectoryBlock, FileDescriptor};
use crate::param::FILES_IN_DIR;

pub struct DirTable<'a> {
    dev: &'a mut BlockDevice,
    block: u64,
}

impl<'a> DirTable<'a> {
    pub fn new(dev: &'a mut BlockDevice, block: u64) -> Self {
        Self { dev, block }
    }

    fn read(&mut self) -> FsResult<DirectoryBlock> {
        let buf = self.dev.read_block(self.block)?;
        DirectoryBlock::decode(&buf)
    }

    fn write(&mut self, block: &DirectoryBlock) -> FsResult<()> {
        self.dev.write_block(self.block, &block.encode())
    }

    pub fn list(&mut self) -> FsResult<Vec<(String, String, u64, u64)>> {
        let block = self.read()?;
        Ok(block
            .files
            .into_iter()
            .map(|f| {
                (
                    f.name,
                    f.ext,
                    f.size,
                    offset_to_block(f.start_offset),
                )
            })
            .collect())
    }

    /// Returns `(size, start_block)` for `(name, ext)`, if present.
    pub fn find(&mut self, name: &str, ext: &str) -> FsResult<Option<(u64, u64)>> {
        let block = self.read()?;
        Ok(block
            .files
            .iter()
            .find(|f| f.name == name && f.ext == ext)
            .map(|f| (f.size, offset_to_block(f.start_offset))))
    }

    /// Appends a new zero-size file entry. Fails with [`FsError::NoSpace`]
    /// once the directory block is full.
    pub fn insert(&mut self, name: &str, ext: &str, start_block: u64) -> FsResult<()> {
        let mut block = self.read()?;

        if block.files.len() >= FILES_IN_DIR {
            return Err(FsError::NoSpace);
        }

        block.files.push(FileDescriptor {
            name: name.to_string(),
            ext: ext.to_string(),
            size: 0,
            start_offset: block_to_offset(start_block),
        });

        self.write(&block)
    }

    pub fn update_size(&mut self, name: &str, ext: &str, new_size: u64) -> FsResult<()> {
        let mut block = self.read()?;

        let entry = block
            .files
            .iter_mut()
            .find(|f| f.name == name && f.ext == ext)
            .ok_or(FsError::NotFound)?;
        entry.size = new_size;

        self.write(&block)
    }

    /// Removes `(name, ext)`, shifting later entries left to keep the array
    /// densely packed (invariant 6).
    pub fn remove(&mut self, name: &str, ext: &str) -> FsResult<()> {
        let mut block = self.read()?;

        let index = block
            .files
            .iter()
            .position(|f| f.name == name && f.ext == ext)
            .ok_or(FsError::NotFound)?;
        block.files.remove(index);

        self.write(&block)
    }
}
