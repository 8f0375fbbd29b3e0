//! Traverses the singly-linked chain of data blocks backing a file's
//! contents, reading or writing a byte range and allocating new blocks on
//! extension.

use crate::bitmap::Bitmap;
use crate::device::BlockDevice;
use crate::error::{FsError, FsResult};
use crate::layout::{block_to_offset, offset_to_block, DataBlock};
use crate::param::{BLOCK_SIZE, DATA_PER_BLOCK};

/// Reads up to `size` bytes starting at `offset` from the chain rooted at
/// `start_block`, which holds a file of `file_size` bytes.
///
/// Stops at the earlier of `size` bytes copied or the file's end — a data
/// block's `nextBlock == 0` terminates the read immediately rather than
/// reading past it, unlike the original implementation this design is
/// modeled on (see the design notes on the read-past-EOF bug).
pub fn read(
    dev: &mut BlockDevice,
    start_block: u64,
    file_size: u64,
    offset: u64,
    size: u64,
) -> FsResult<Vec<u8>> {
    if offset > file_size {
        return Ok(Vec::new());
    }

    let to_read = size.min(file_size - offset);
    if to_read == 0 {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(to_read as usize);

    let mut block = seek_chain(dev, start_block, offset / DATA_PER_BLOCK as u64)?;
    let mut pos_in_block = (offset % DATA_PER_BLOCK as u64) as usize;

    while (out.len() as u64) < to_read {
        let buf = dev.read_block(block)?;
        let payload = DataBlock::payload(&buf);

        let remaining_in_block = DATA_PER_BLOCK - pos_in_block;
        let remaining_in_request = (to_read - out.len() as u64) as usize;
        let n = remaining_in_block.min(remaining_in_request);

        out.extend_from_slice(&payload[pos_in_block..pos_in_block + n]);

        if (out.len() as u64) >= to_read {
            break;
        }

        let next = DataBlock::next_block(&buf);
        if next == 0 {
            break;
        }
        block = offset_to_block(next);
        pos_in_block = 0;
    }

    Ok(out)
}

/// Writes `bytes` starting at `offset` into the chain rooted at
/// `start_block`, extending the chain with freshly-allocated blocks as
/// needed. Returns the number of bytes written.
pub fn write(
    dev: &mut BlockDevice,
    start_block: u64,
    offset: u64,
    bytes: &[u8],
) -> FsResult<usize> {
    if bytes.is_empty() {
        return Ok(0);
    }

    let mut block = seek_chain_for_write(dev, start_block, offset / DATA_PER_BLOCK as u64)?;
    let mut pos_in_block = (offset % DATA_PER_BLOCK as u64) as usize;

    let mut written = 0usize;
    while written < bytes.len() {
        let mut buf = dev.read_block(block)?;

        let remaining_in_block = DATA_PER_BLOCK - pos_in_block;
        let n = remaining_in_block.min(bytes.len() - written);

        DataBlock::payload_mut(&mut buf)[pos_in_block..pos_in_block + n]
            .copy_from_slice(&bytes[written..written + n]);
        written += n;
        pos_in_block += n;

        if written == bytes.len() {
            dev.write_block(block, &buf)?;
            break;
        }

        // pos_in_block == DATA_PER_BLOCK here: advance to the next block,
        // following an existing link if this is an interior overwrite
        // rather than always allocating (which would orphan the rest of
        // the chain, per invariant 1).
        let existing_next = DataBlock::next_block(&buf);
        let next_block = if existing_next != 0 {
            offset_to_block(existing_next)
        } else {
            let new_block = {
                let mut bitmap = Bitmap::new(dev);
                bitmap.allocate()?
            };
            dev.write_block(new_block, &[0u8; BLOCK_SIZE])?;
            DataBlock::set_next_block(&mut buf, block_to_offset(new_block));
            new_block
        };
        dev.write_block(block, &buf)?;

        block = next_block;
        pos_in_block = 0;
    }

    Ok(written)
}

/// Walks `hops` links from `start_block` along `nextBlock`, returning the
/// block reached.
fn seek_chain(dev: &mut BlockDevice, start_block: u64, hops: u64) -> FsResult<u64> {
    let mut block = start_block;
    for _ in 0..hops {
        let buf = dev.read_block(block)?;
        let next = DataBlock::next_block(&buf);
        if next == 0 {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "chain ended before reaching requested offset",
            )));
        }
        block = offset_to_block(next);
    }
    Ok(block)
}

/// Like [`seek_chain`], but used for writes: a write at `offset ==
/// current_size` lands exactly one hop past the chain's last block when
/// `current_size` is a multiple of [`DATA_PER_BLOCK`], which is a legitimate
/// append rather than a corrupt chain — so a missing link here is extended
/// with a freshly-allocated block instead of raising an error.
fn seek_chain_for_write(dev: &mut BlockDevice, start_block: u64, hops: u64) -> FsResult<u64> {
    let mut block = start_block;
    for _ in 0..hops {
        let mut buf = dev.read_block(block)?;
        let mut next = DataBlock::next_block(&buf);

        if next == 0 {
            let new_block = {
                let mut bitmap = Bitmap::new(dev);
                bitmap.allocate()?
            };
            dev.write_block(new_block, &[0u8; BLOCK_SIZE])?;

            DataBlock::set_next_block(&mut buf, block_to_offset(new_block));
            dev.write_block(block, &buf)?;

            next = block_to_offset(new_block);
        }

        block = offset_to_block(next);
    }
    Ok(block)
}

/// Frees every block in the chain rooted at `start_block`, zeroing each
/// block's on-disk contents as it is released.
pub fn free_chain(dev: &mut BlockDevice, start_block: u64) -> FsResult<()> {
    let mut block = start_block;
    loop {
        let buf = dev.read_block(block)?;
        let next = DataBlock::next_block(&buf);

        {
            let mut bitmap = Bitmap::new(dev);
            bitmap.release(block)?;
        }
        dev.write_block(block, &[0u8; BLOCK_SIZE])?;

        if next == 0 {
            break;
        }
        block = offset_to_block(next);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use tempfile::NamedTempFile;

    fn image(blocks: u64) -> (NamedTempFile, BlockDevice) {
        let file = NamedTempFile::new().unwrap();
        let len = blocks * BLOCK_SIZE as u64 + blocks;
        file.as_file().set_len(len).unwrap();
        let mut dev = BlockDevice::open(file.path(), blocks).unwrap();

        // mark block 0 used, matching invariant 1, so allocate() never
        // returns it to a test.
        {
            let mut bitmap = Bitmap::new(&mut dev);
            let b = bitmap.allocate().unwrap();
            assert_eq!(b, 1);
            bitmap.release(b).unwrap();
        }

        (file, dev)
    }

    fn alloc_block(dev: &mut BlockDevice) -> u64 {
        let mut bitmap = Bitmap::new(dev);
        bitmap.allocate().unwrap()
    }

    #[test]
    fn write_then_read_round_trips_within_one_block() {
        let (_f, mut dev) = image(32);
        let start = alloc_block(&mut dev);
        dev.write_block(start, &[0u8; BLOCK_SIZE]).unwrap();

        let data = b"hello, world";
        let n = write(&mut dev, start, 0, data).unwrap();
        assert_eq!(n, data.len());

        let out = read(&mut dev, start, data.len() as u64, 0, data.len() as u64).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn write_spanning_multiple_blocks_links_chain() {
        let (_f, mut dev) = image(64);
        let start = alloc_block(&mut dev);
        dev.write_block(start, &[0u8; BLOCK_SIZE]).unwrap();

        let data = vec![0x42u8; 1024];
        let n = write(&mut dev, start, 0, &data).unwrap();
        assert_eq!(n, 1024);

        let out = read(&mut dev, start, 1024, 0, 1024).unwrap();
        assert_eq!(out, data);

        // 1024 bytes at 504/block needs 3 blocks.
        let buf0 = dev.read_block(start).unwrap();
        let next1 = DataBlock::next_block(&buf0);
        assert_ne!(next1, 0);
        let buf1 = dev.read_block(offset_to_block(next1)).unwrap();
        let next2 = DataBlock::next_block(&buf1);
        assert_ne!(next2, 0);
        let buf2 = dev.read_block(offset_to_block(next2)).unwrap();
        assert_eq!(DataBlock::next_block(&buf2), 0);
    }

    #[test]
    fn interior_overwrite_crossing_a_block_boundary_preserves_the_chain() {
        let (_f, mut dev) = image(64);
        let start = alloc_block(&mut dev);
        dev.write_block(start, &[0u8; BLOCK_SIZE]).unwrap();

        // 1008 bytes needs exactly two 504-byte blocks.
        let original = vec![0x11u8; 1008];
        write(&mut dev, start, 0, &original).unwrap();

        let buf0 = dev.read_block(start).unwrap();
        let next1_offset = DataBlock::next_block(&buf0);
        assert_ne!(next1_offset, 0, "file must already span two blocks");
        let next1 = offset_to_block(next1_offset);

        // Overwrite a range that starts inside the first block and ends
        // inside the second, without appending.
        let patch = vec![0xAAu8; 600];
        let n = write(&mut dev, start, 200, &patch).unwrap();
        assert_eq!(n, 600);

        // The chain must still be exactly start -> next1, not start ->
        // some freshly-allocated third block with next1 orphaned.
        let buf0_after = dev.read_block(start).unwrap();
        assert_eq!(DataBlock::next_block(&buf0_after), next1_offset);
        let buf1_after = dev.read_block(next1).unwrap();
        assert_eq!(DataBlock::next_block(&buf1_after), 0);

        let mut expected = original.clone();
        expected[200..800].copy_from_slice(&patch);
        let out = read(&mut dev, start, 1008, 0, 1008).unwrap();
        assert_eq!(out, expected);

        // next1 must still be the only other used block in the chain: no
        // leaked third block left allocated and unreachable.
        let mut bitmap = Bitmap::new(&mut dev);
        assert!(bitmap.is_used(start).unwrap());
        assert!(bitmap.is_used(next1).unwrap());
        for b in 1..64u64 {
            if b != start && b != next1 {
                assert!(!bitmap.is_used(b).unwrap(), "block {b} unexpectedly used");
            }
        }
    }

    #[test]
    fn read_stops_exactly_at_file_size_even_mid_block() {
        let (_f, mut dev) = image(32);
        let start = alloc_block(&mut dev);
        dev.write_block(start, &[0u8; BLOCK_SIZE]).unwrap();

        write(&mut dev, start, 0, b"abc").unwrap();
        let out = read(&mut dev, start, 3, 0, 100).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn free_chain_releases_every_block() {
        let (_f, mut dev) = image(64);
        let start = alloc_block(&mut dev);
        dev.write_block(start, &[0u8; BLOCK_SIZE]).unwrap();

        let data = vec![0x7u8; 1024];
        write(&mut dev, start, 0, &data).unwrap();

        let buf0 = dev.read_block(start).unwrap();
        let next1 = offset_to_block(DataBlock::next_block(&buf0));
        let buf1 = dev.read_block(next1).unwrap();
        let next2 = offset_to_block(DataBlock::next_block(&buf1));

        free_chain(&mut dev, start).unwrap();

        let mut bitmap = Bitmap::new(&mut dev);
        assert!(!bitmap.is_used(start).unwrap());
        assert!(!bitmap.is_used(next1).unwrap());
        assert!(!bitmap.is_used(next2).unwrap());
    }
}
