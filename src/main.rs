//! `blockfs` mounts a pre-sized `.disk` image (see the companion `mkimage`
//! binary) as a two-level 8.3 namespace through `fuser`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fuser::MountOption;

use blockfs::filesystem::Filesystem;
use blockfs::fuse_adapter::FuseAdapter;
use blockfs::param::DEFAULT_BLOCKS;

/// Mount a two-level 8.3 block filesystem image.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Mount point.
    mountpoint: PathBuf,

    /// Path to the pre-sized `.disk` image.
    #[arg(long, default_value = ".disk")]
    image: PathBuf,

    /// Number of 512-byte blocks the image holds (must match the value
    /// `mkimage` was given when the image was created).
    #[arg(long, default_value_t = DEFAULT_BLOCKS)]
    blocks: u64,

    /// Stay attached to the terminal instead of letting the kernel tear the
    /// mount down when this process exits.
    #[arg(short, long)]
    foreground: bool,

    /// Extra `-o`-style mount options forwarded to fuser, comma-separated.
    #[arg(short = 'o', long, value_delimiter = ',')]
    options: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let fs = Filesystem::new(cli.image.clone(), cli.blocks);

    // Fail fast, before handing off to fuser, if the image is missing or the
    // wrong size for `--blocks`.
    if let Err(e) = fs.getattr("/") {
        log::error!("cannot open image {}: {e}", cli.image.display());
        return ExitCode::FAILURE;
    }

    let mut mount_options = vec![MountOption::FSName("blockfs".to_string())];
    if !cli.foreground {
        mount_options.push(MountOption::AutoUnmount);
    }
    mount_options.extend(cli.options.iter().cloned().map(MountOption::CUSTOM));

    log::info!(
        "mounting {} at {}",
        cli.image.display(),
        cli.mountpoint.display()
    );

    if let Err(e) = fuser::mount2(FuseAdapter::new(fs), &cli.mountpoint, &mount_options) {
        log::error!("mount failed: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
