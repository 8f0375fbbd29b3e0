//! Bridges `fuser`'s inode-oriented `Filesystem` trait to this crate's
//! path-oriented core.
//!
//! `fuser` addresses every entry after the first `lookup` by an opaque
//! 64-bit inode number; nothing on disk in this design has a persistent
//! inode number (a file is identified by its parent directory's start block
//! plus its (name, ext)). [`InodeTable`] bridges the two by handing out
//! fresh numbers the first time a path is seen and remembering the mapping
//! for the life of the mount. It is pure in-memory, per-session state — the
//! one exception to the core's "nothing survives between calls" rule
//! (§5), which is `fuser`'s requirement, not the filesystem's.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem as FuseFilesystem, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};

use crate::error::{FsError, FsResult};
use crate::filesystem::{EntryKind, Filesystem, Stat};
use crate::param::BLOCK_SIZE;

const TTL: Duration = Duration::from_secs(1);

/// Maps `fuser` inode numbers to the paths this core actually understands.
/// Inode 1 is always `/`; every other number is assigned the first time its
/// path is resolved (via `lookup` or `readdir`) and kept for the mount's
/// lifetime.
struct InodeTable {
    next: u64,
    paths: HashMap<u64, String>,
    inos: HashMap<String, u64>,
}

impl InodeTable {
    fn new() -> Self {
        let mut paths = HashMap::new();
        paths.insert(FUSE_ROOT_ID, "/".to_string());
        let mut inos = HashMap::new();
        inos.insert("/".to_string(), FUSE_ROOT_ID);
        Self {
            next: FUSE_ROOT_ID + 1,
            paths,
            inos,
        }
    }

    fn path(&self, ino: u64) -> FsResult<String> {
        self.paths.get(&ino).cloned().ok_or(FsError::NotFound)
    }

    /// Returns the inode assigned to `path`, assigning the next free one if
    /// this is the first time `path` has been resolved.
    fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inos.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.inos.insert(path.to_string(), ino);
        self.paths.insert(ino, path.to_string());
        ino
    }
}

fn child_path(parent_path: &str, name: &str) -> String {
    if parent_path == "/" {
        format!("/{name}")
    } else {
        format!("{parent_path}/{name}")
    }
}

fn to_file_attr(ino: u64, stat: &Stat, req: &Request<'_>) -> FileAttr {
    let now = SystemTime::now();
    let (kind, perm, blocks) = match stat.kind {
        EntryKind::Directory => (FileType::Directory, 0o755, 0),
        EntryKind::File => {
            let blocks = stat.size.div_ceil(BLOCK_SIZE as u64);
            (FileType::RegularFile, 0o644, blocks)
        }
    };

    FileAttr {
        ino,
        size: stat.size,
        blocks,
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind,
        perm,
        nlink: stat.nlink,
        uid: req.uid(),
        gid: req.gid(),
        rdev: 0,
        blksize: BLOCK_SIZE as u32,
        flags: 0,
    }
}

/// Implements `fuser::Filesystem` by translating every call into a path and
/// delegating to the core [`Filesystem`]. Holds no filesystem state itself
/// beyond the [`InodeTable`] — every request still reopens the image via
/// the core.
pub struct FuseAdapter {
    fs: Filesystem,
    inodes: InodeTable,
}

impl FuseAdapter {
    pub fn new(fs: Filesystem) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
        }
    }

    fn path_of(&self, ino: u64) -> FsResult<String> {
        self.inodes.path(ino)
    }
}

impl FuseFilesystem for FuseAdapter {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        log::info!("mounting {}", self.fs.image_path().display());
        Ok(())
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        let path = child_path(&parent_path, name);

        match self.fs.getattr(&path) {
            Ok(stat) => {
                let ino = self.inodes.ino_for(&path);
                reply.entry(&TTL, &to_file_attr(ino, &stat, req), 0);
            }
            Err(e) => {
                log::warn!("lookup {path}: {e}");
                reply.error(e.to_errno());
            }
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        match self.fs.getattr(&path) {
            Ok(stat) => reply.attr(&TTL, &to_file_attr(ino, &stat, req)),
            Err(e) => {
                log::warn!("getattr {path}: {e}");
                reply.error(e.to_errno());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        if let Some(new_size) = size {
            if let Err(e) = self.fs.truncate(&path, new_size) {
                reply.error(e.to_errno());
                return;
            }
        }

        match self.fs.getattr(&path) {
            Ok(stat) => reply.attr(&TTL, &to_file_attr(ino, &stat, req)),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let entries = match self.fs.readdir(&path) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("readdir {path}: {e}");
                reply.error(e.to_errno());
                return;
            }
        };

        for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
            let child_ino = match entry.name.as_str() {
                "." => ino,
                ".." => FUSE_ROOT_ID,
                _ => self.inodes.ino_for(&child_path(&path, &entry.name)),
            };
            let kind = match entry.kind {
                EntryKind::Directory => FileType::Directory,
                EntryKind::File => FileType::RegularFile,
            };

            // A full reply buffer means the kernel will retry with a later
            // offset; stop here rather than drop the rest of the entries.
            if reply.add(child_ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(name) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        let path = child_path(&parent_path, name);

        if let Err(e) = self.fs.mkdir(&path) {
            log::warn!("mkdir {path}: {e}");
            reply.error(e.to_errno());
            return;
        }

        match self.fs.getattr(&path) {
            Ok(stat) => {
                let ino = self.inodes.ino_for(&path);
                reply.entry(&TTL, &to_file_attr(ino, &stat, req), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let Some(name) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        let path = child_path(&parent_path, name);

        if let Err(e) = self.fs.mknod(&path) {
            log::warn!("mknod {path}: {e}");
            reply.error(e.to_errno());
            return;
        }

        match self.fs.getattr(&path) {
            Ok(stat) => {
                let ino = self.inodes.ino_for(&path);
                reply.entry(&TTL, &to_file_attr(ino, &stat, req), 0);
            }
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        let path = child_path(&parent_path, name);

        match self.fs.unlink(&path) {
            Ok(()) => reply.ok(),
            Err(e) => {
                log::warn!("unlink {path}: {e}");
                reply.error(e.to_errno());
            }
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        let parent_path = match self.path_of(parent) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };
        let path = child_path(&parent_path, name);

        match self.fs.rmdir(&path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.to_errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        if let Err(e) = self.path_of(ino) {
            reply.error(e.to_errno());
            return;
        }
        // No per-open state to track (§5); every subsequent call re-resolves
        // the path from `ino` and ignores the handle.
        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        match self.fs.read(&path, size as u64, offset as u64) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                log::warn!("read {path}: {e}");
                reply.error(e.to_errno());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        match self.fs.write(&path, data, offset as u64) {
            Ok(written) => reply.written(written as u32),
            Err(e) => {
                log::warn!("write {path}: {e}");
                reply.error(e.to_errno());
            }
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        if let Err(e) = self.path_of(ino) {
            reply.error(e.to_errno());
            return;
        }
        reply.ok();
    }
}
