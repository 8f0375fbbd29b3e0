//! On-disk sizing constants, derived at compile time rather than hard-coded.

/// Size of a disk block, in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Maximum length of a directory or file name (the "8" in 8.3).
pub const MAX_NAME: usize = 8;
/// Maximum length of a file extension (the "3" in 8.3).
pub const MAX_EXT: usize = 3;

/// Default number of blocks in a freshly-created image.
///
/// Chosen so the bitmap region is exactly 20 blocks (10,240 bytes, one byte
/// per block) at the tail of a 5 MiB image.
pub const DEFAULT_BLOCKS: u64 = 10_240;

/// Byte width of `nDirectories`/`nFiles` count fields.
const COUNT_SIZE: usize = size_of::<u32>();
/// Byte width of a start-block byte offset.
const OFFSET_SIZE: usize = size_of::<u64>();
/// Byte width of a file size field.
const SIZE_SIZE: usize = size_of::<u64>();
/// Byte width of a next-block pointer.
const NEXT_SIZE: usize = size_of::<u64>();

/// On-disk width of a directory descriptor: `[name, NUL][start_offset]`.
pub const DIR_DESCRIPTOR_SIZE: usize = (MAX_NAME + 1) + OFFSET_SIZE;
/// On-disk width of a file descriptor: `[name, NUL][ext, NUL][size][start_offset]`.
pub const FILE_DESCRIPTOR_SIZE: usize = (MAX_NAME + 1) + (MAX_EXT + 1) + SIZE_SIZE + OFFSET_SIZE;

/// Maximum directory descriptors that fit in the root block.
pub const DIRS_IN_ROOT: usize = (BLOCK_SIZE - COUNT_SIZE) / DIR_DESCRIPTOR_SIZE;
/// Maximum file descriptors that fit in a directory block.
pub const FILES_IN_DIR: usize = (BLOCK_SIZE - COUNT_SIZE) / FILE_DESCRIPTOR_SIZE;

/// Bytes of file payload held by a single data block.
pub const DATA_PER_BLOCK: usize = BLOCK_SIZE - NEXT_SIZE;

/// Block number 0 (the root block) is always reserved.
pub const ROOT_BLOCK: u64 = 0;
