//! Pre-sizes and zero-initializes a `.disk` image for `blockfs`.
//!
//! The byte layout this tool produces is a frozen external contract (see
//! `blockfs`'s `layout.rs`/`param.rs`): this binary hard-codes the same
//! constants independently rather than depending on the `blockfs` crate, so
//! that the two can only drift apart by someone changing both on purpose.

use std::fs::OpenOptions;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

const BLOCK_SIZE: u64 = 512;
const DEFAULT_BLOCKS: u64 = 10_240;

/// Pre-size and zero-initialize a blockfs disk image.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to create the image at.
    path: PathBuf,

    /// Number of 512-byte blocks in the data region (the bitmap adds one
    /// byte per block on top of that).
    #[arg(long, default_value_t = DEFAULT_BLOCKS)]
    blocks: u64,
}

/// Writes a fresh image: `blocks` zeroed data blocks followed by a
/// `blocks`-byte bitmap with only block 0 (the root block) marked used.
fn write_image(path: &Path, blocks: u64) -> io::Result<()> {
    let data_len = blocks * BLOCK_SIZE;
    let total_len = data_len + blocks;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    // `set_len` zero-fills (as a sparse hole, where the filesystem
    // supports it): every data block and the whole bitmap region start
    // out all-zero without this tool writing them byte by byte.
    file.set_len(total_len)?;

    // Root block: nDirectories = 0, native-endian; the rest of the block
    // (directory descriptor slots, padding) is already zero.
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&0u32.to_ne_bytes())?;

    // Bitmap region: block 0 is reserved for the root block and starts
    // out used; every other block starts out free.
    file.seek(SeekFrom::Start(data_len))?;
    file.write_all(&[1u8])?;

    file.sync_all()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.blocks < 1 {
        eprintln!("mkimage: --blocks must be at least 1 (block 0 is the root block)");
        return ExitCode::FAILURE;
    }

    match write_image(&cli.path, cli.blocks) {
        Ok(()) => {
            println!(
                "created {} ({} blocks, {} bytes)",
                cli.path.display(),
                cli.blocks,
                cli.blocks * BLOCK_SIZE + cli.blocks
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("mkimage: {e}");
            ExitCode::FAILURE
        }
    }
}
