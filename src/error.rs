//! Error taxonomy for the filesystem core.
//!
//! Every fallible operation in this crate returns [`FsError`]. The
//! `fuse_adapter` module is the only place these get turned into the
//! negative errno values libfuse expects; nothing else in the core cares
//! about that representation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    Exists,
    #[error("name too long")]
    NameTooLong,
    #[error("operation not permitted")]
    OperationNotPermitted,
    #[error("is a directory")]
    IsDirectory,
    #[error("file too big")]
    FileTooBig,
    #[error("no space left on device")]
    NoSpace,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Maps this error to the `libc` errno libfuse expects in a reply.
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::Exists => libc::EEXIST,
            FsError::NameTooLong => libc::ENAMETOOLONG,
            FsError::OperationNotPermitted => libc::EPERM,
            FsError::IsDirectory => libc::EISDIR,
            FsError::FileTooBig => libc::EFBIG,
            FsError::NoSpace => libc::ENOSPC,
            FsError::Io(_) => libc::EIO,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
