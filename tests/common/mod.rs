use std::collections::HashSet;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use blockfs::bitmap::Bitmap;
use blockfs::device::BlockDevice;
use blockfs::dir_table::DirTable;
use blockfs::filesystem::Filesystem;
use blockfs::layout::{offset_to_block, DataBlock};
use blockfs::root_table::RootTable;
use tempfile::NamedTempFile;

/// Builds a fresh, empty image with the same layout `mkimage` produces
/// (zeroed root block, block 0 marked used in the bitmap) and returns the
/// `Filesystem` over it together with the backing tempfile, which must be
/// kept alive for the image path to stay valid.
pub fn fresh_filesystem(blocks: u64) -> (NamedTempFile, Filesystem) {
    let file = NamedTempFile::new().unwrap();
    let total_len = blocks * 512 + blocks;
    file.as_file().set_len(total_len).unwrap();

    let mut f = file.reopen().unwrap();
    f.seek(SeekFrom::Start(blocks * 512)).unwrap();
    f.write_all(&[1u8]).unwrap();

    let fs = Filesystem::new(file.path().to_path_buf(), blocks);
    (file, fs)
}

/// Asserts invariant 1/3/4 from spec §8: every block the bitmap marks used
/// is reachable from the root table (directly, as a directory's start
/// block) or from a directory table (via a file's data chain), and vice
/// versa — no block is marked used without something pointing to it, and
/// nothing reachable is marked free.
pub fn check_consistency(path: &Path, blocks: u64) {
    let mut dev = BlockDevice::open(path, blocks).unwrap();

    let mut reachable: HashSet<u64> = HashSet::new();
    reachable.insert(0);

    let dirs = RootTable::new(&mut dev).list().unwrap();
    for (_, dir_block) in &dirs {
        reachable.insert(*dir_block);

        let files = DirTable::new(&mut dev, *dir_block).list().unwrap();
        for (_, _, _, start) in files {
            let mut block = start;
            reachable.insert(block);
            loop {
                let buf = dev.read_block(block).unwrap();
                let next = DataBlock::next_block(&buf);
                if next == 0 {
                    break;
                }
                block = offset_to_block(next);
                reachable.insert(block);
            }
        }
    }

    for b in 0..blocks {
        let used = Bitmap::new(&mut dev).is_used(b).unwrap();
        let expected = reachable.contains(&b);
        assert_eq!(
            used, expected,
            "block {b}: bitmap says used={used}, reachability says reachable={expected}"
        );
    }
}
