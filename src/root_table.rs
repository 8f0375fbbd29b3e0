//! Reads and writes the root block (block 0): the ordered list of
//! subdirectories and their start blocks.

use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::layout::{block_to_offset, offset_to_block, DirDescriptor, RootBlock};
use crate::param::{DIRS_IN_ROOT, ROOT_BLOCK};

pub struct RootTable<'a> {
    dev: &'a mut BlockDevice,
}

impl<'a> RootTable<'a> {
    pub fn new(dev: &'a mut BlockDevice) -> Self {
        Self { dev }
    }

    fn read(&mut self) -> FsResult<RootBlock> {
        let buf = self.dev.read_block(ROOT_BLOCK)?;
        RootBlock::decode(&buf)
    }

    fn write(&mut self, block: &RootBlock) -> FsResult<()> {
        self.dev.write_block(ROOT_BLOCK, &block.encode())
    }

    pub fn list(&mut self) -> FsResult<Vec<(String, u64)>> {
        let block = self.read()?;
        Ok(block
            .dirs
            .into_iter()
            .map(|d| (d.name, offset_to_block(d.start_offset)))
            .collect())
    }

    /// Returns the start block of the directory named `name`, if it exists.
    pub fn find(&mut self, name: &str) -> FsResult<Option<u64>> {
        let block = self.read()?;
        Ok(block
            .dirs
            .iter()
            .find(|d| d.name == name)
            .map(|d| offset_to_block(d.start_offset)))
    }

    /// Appends a new directory descriptor. Fails with [`FsError::NoSpace`]
    /// once the root block is full.
    pub fn insert(&mut self, name: &str, start_block: u64) -> FsResult<()> {
        let mut block = self.read()?;

        if block.dirs.len() >= DIRS_IN_ROOT {
            return Err(FsError::NoSpace);
        }

        block.dirs.push(DirDescriptor {
            name: name.to_string(),
            start_offset: block_to_offset(start_block),
        });

        self.write(&block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::BLOCK_SIZE;
    use tempfile::NamedTempFile;

    fn image(blocks: u64) -> (NamedTempFile, BlockDevice) {
        let file = NamedTempFile::new().unwrap();
        let len = blocks * BLOCK_SIZE as u64 + blocks;
        file.as_file().set_len(len).unwrap();
        let dev = BlockDevice::open(file.path(), blocks).unwrap();
        (file, dev)
    }

    #[test]
    fn insert_then_find_round_trips() {
        let (_f, mut dev) = image(32);
        let mut table = RootTable::new(&mut dev);

        table.insert("notes", 5).unwrap();
        assert_eq!(table.find("notes").unwrap(), Some(5));
        assert_eq!(table.find("missing").unwrap(), None);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let (_f, mut dev) = image(32);
        let mut table = RootTable::new(&mut dev);

        table.insert("a", 1).unwrap();
        table.insert("b", 2).unwrap();

        assert_eq!(
            table.list().unwrap(),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn insert_fails_when_root_is_full() {
        let (_f, mut dev) = image(2048);
        let mut table = RootTable::new(&mut dev);

        for i in 0..DIRS_IN_ROOT {
            table.insert(&format!("d{i}"), (i + 1) as u64).unwrap();
        }

        assert!(matches!(table.insert("one-more", 999), Err(FsError::NoSpace)));
    }
}
