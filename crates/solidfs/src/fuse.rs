//! I define the kernel bridge: a thin [`fuser`] driver translating
//! inode-addressed callbacks into the path-addressed operations of
//! [`SolidFs`], and typed errors into negative errno replies.
//!

use std::{
    collections::HashMap,
    ffi::OsStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr,
    Request, TimeOrNow,
};
use tracing::debug;

use crate::{
    error::FsError,
    fs::{DirEntry, EntryKind, SolidFs, XattrReply},
    path,
    resource::ResourceStat,
};

/// How long the kernel may cache attributes and entries.
const TTL: Duration = Duration::from_secs(1);

/// Inode of the mount root, fixed by the FUSE protocol.
const ROOT_INODE: u64 = 1;

/// Bidirectional inode ↔ path table.
///
/// Inodes are assigned on first sight of a path and never reused
/// within a mount's lifetime.
struct InodeTable {
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut table = Self {
            paths: HashMap::new(),
            inodes: HashMap::new(),
            next: ROOT_INODE + 1,
        };
        table.paths.insert(ROOT_INODE, "/".to_owned());
        table.inodes.insert("/".to_owned(), ROOT_INODE);
        table
    }

    fn path(&self, inode: u64) -> Option<&str> {
        self.paths.get(&inode).map(String::as_str)
    }

    fn assign(&mut self, path: &str) -> u64 {
        if let Some(inode) = self.inodes.get(path) {
            return *inode;
        }
        let inode = self.next;
        self.next += 1;
        self.paths.insert(inode, path.to_owned());
        self.inodes.insert(path.to_owned(), inode);
        inode
    }

    /// Join a parent inode and an entry name into a path.
    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, i32> {
        let parent_path = self.path(parent).ok_or(libc::ENOENT)?;
        let name = path::decode(name).map_err(|e| e.errno())?;
        Ok(if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        })
    }

    fn forget_path(&mut self, path: &str) {
        if let Some(inode) = self.inodes.remove(path) {
            self.paths.remove(&inode);
        }
    }

    fn rename_path(&mut self, old: &str, new: &str) {
        self.forget_path(new);
        if let Some(inode) = self.inodes.remove(old) {
            self.paths.insert(inode, new.to_owned());
            self.inodes.insert(new.to_owned(), inode);
        }
    }
}

/// The kernel driver of one mount.
pub struct SolidFsDriver {
    fs: SolidFs,
    inodes: InodeTable,
}

impl SolidFsDriver {
    /// Wrap an adapter for mounting.
    pub fn new(fs: SolidFs) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
        }
    }

    fn attr_for(&self, inode: u64, stat: &ResourceStat) -> FileAttr {
        let kind = if stat.mode & libc::S_IFMT == libc::S_IFDIR {
            FileType::Directory
        } else {
            FileType::RegularFile
        };
        let mtime = UNIX_EPOCH + Duration::from_secs(stat.mtime.max(0) as u64);
        FileAttr {
            ino: inode,
            size: stat.size,
            blocks: stat.size.div_ceil(512),
            atime: UNIX_EPOCH,
            mtime,
            ctime: mtime,
            crtime: UNIX_EPOCH,
            kind,
            perm: (stat.mode & 0o7777) as u16,
            nlink: stat.nlink,
            uid: 0,
            gid: 0,
            rdev: 0,
            blksize: 128 * 1024,
            flags: 0,
        }
    }

    fn getattr_reply(&mut self, path: &str, inode: u64, reply: ReplyAttr) {
        match self.fs.getattr(path) {
            Ok(stat) => reply.attr(&TTL, &self.attr_for(inode, &stat)),
            Err(e) => reply.error(reply_errno(&e)),
        }
    }
}

/// Negative-free errno of an error, logged on the way out.
fn reply_errno(e: &FsError) -> i32 {
    debug!(error = %e, errno = e.errno(), "Replying with errno");
    e.errno()
}

fn entry_file_type(kind: EntryKind) -> FileType {
    match kind {
        EntryKind::Directory => FileType::Directory,
        EntryKind::File => FileType::RegularFile,
    }
}

impl Filesystem for SolidFsDriver {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        Ok(())
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.inodes.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.getattr(&path) {
            Ok(stat) => {
                let inode = self.inodes.assign(&path);
                reply.entry(&TTL, &self.attr_for(inode, &stat), 0);
            }
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.inodes.path(ino).map(str::to_owned) else {
            return reply.error(libc::ENOENT);
        };
        self.getattr_reply(&path, ino, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.inodes.path(ino).map(str::to_owned) else {
            return reply.error(libc::ENOENT);
        };

        if let Some(size) = size {
            if let Err(e) = self.fs.truncate(&path, size as i64) {
                return reply.error(reply_errno(&e));
            }
        }
        if let Some(mode) = mode {
            if let Err(e) = self.fs.chmod(&path, mode) {
                return reply.error(reply_errno(&e));
            }
        }
        if uid.is_some() || gid.is_some() {
            if let Err(e) = self
                .fs
                .chown(&path, uid.unwrap_or_default(), gid.unwrap_or_default())
            {
                return reply.error(reply_errno(&e));
            }
        }
        if atime.is_some() || mtime.is_some() {
            let as_epoch = |t: Option<TimeOrNow>| match t {
                Some(TimeOrNow::SpecificTime(t)) => t
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or_default(),
                _ => 0,
            };
            if let Err(e) = self.fs.utime(&path, (as_epoch(atime), as_epoch(mtime))) {
                return reply.error(reply_errno(&e));
            }
        }

        self.getattr_reply(&path, ino, reply);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.inodes.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if let Err(e) = self.fs.mkdir(&path, mode) {
            return reply.error(reply_errno(&e));
        }
        match self.fs.getattr(&path) {
            Ok(stat) => {
                let inode = self.inodes.assign(&path);
                reply.entry(&TTL, &self.attr_for(inode, &stat), 0);
            }
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.inodes.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.unlink(&path) {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.inodes.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.rmdir(&path) {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (source, target) = match (
            self.inodes.child_path(parent, name),
            self.inodes.child_path(newparent, newname),
        ) {
            (Ok(source), Ok(target)) => (source, target),
            (Err(errno), _) | (_, Err(errno)) => return reply.error(errno),
        };
        match self.fs.rename(&source, &target) {
            Ok(()) => {
                self.inodes.rename_path(&source, &target);
                reply.ok();
            }
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inodes.path(ino) else {
            return reply.error(libc::ENOENT);
        };
        match self.fs.open(path, flags) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    #[allow(clippy::too_many_arguments)]
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
        let Some(path) = self.inodes.path(ino) else {
            return reply.error(libc::ENOENT);
        };
        match self.fs.read(path, size as usize, offset.max(0) as usize) {
            Ok(content) => reply.data(&content),
            Err(e) => reply.error(reply_errno(&e)),
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
        let Some(path) = self.inodes.path(ino) else {
            return reply.error(libc::ENOENT);
        };
        match self.fs.write(path, data, offset.max(0) as usize) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let Some(path) = self.inodes.path(ino) else {
            return reply.error(libc::ENOENT);
        };
        match self.fs.flush(path) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // The kernel issues a flush before the release.
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inodes.path(ino).map(str::to_owned) else {
            return reply.error(libc::ENOENT);
        };
        let entries = match self.fs.readdir(&path, offset.max(0) as u64) {
            Ok(entries) => entries,
            Err(e) => return reply.error(reply_errno(&e)),
        };

        for (index, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            let entry_inode = entry_inode(&mut self.inodes, ino, &path, entry);
            if reply.add(
                entry_inode,
                (index + 1) as i64,
                entry_file_type(entry.kind),
                &entry.name,
            ) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let statfs = self.fs.statfs();
        reply.statfs(
            statfs.blocks,
            statfs.blocks_free,
            statfs.blocks_available,
            statfs.files,
            statfs.files_free,
            statfs.block_size,
            statfs.name_max,
            statfs.block_size,
        );
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            return reply.error(libc::ENOENT);
        };
        let name = match path::decode(name) {
            Ok(name) => name,
            Err(e) => return reply.error(e.errno()),
        };
        match self.fs.getxattr(path, name, size as u64) {
            Ok(XattrReply::Size(needed)) => reply.size(needed as u32),
            Ok(XattrReply::Data(data)) => {
                if data.len() > size as usize {
                    reply.error(libc::ERANGE)
                } else {
                    reply.data(&data)
                }
            }
            Ok(XattrReply::Names(_)) => reply.error(libc::EBADMSG),
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        let Some(path) = self.inodes.path(ino) else {
            return reply.error(libc::ENOENT);
        };
        match self.fs.listxattr(path, size as u64) {
            Ok(XattrReply::Size(needed)) => reply.size(needed as u32),
            Ok(XattrReply::Names(names)) => {
                let mut data = Vec::new();
                for name in names {
                    data.extend_from_slice(name.as_bytes());
                    data.push(0);
                }
                if data.len() > size as usize {
                    reply.error(libc::ERANGE)
                } else {
                    reply.data(&data)
                }
            }
            Ok(XattrReply::Data(_)) => reply.error(libc::EBADMSG),
            Err(e) => reply.error(reply_errno(&e)),
        }
    }

    fn access(&mut self, _req: &Request<'_>, _ino: u64, _mask: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.inodes.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        if let Err(e) = self.fs.create(&path, mode, umask) {
            return reply.error(reply_errno(&e));
        }
        match self.fs.getattr(&path) {
            Ok(stat) => {
                let inode = self.inodes.assign(&path);
                reply.created(&TTL, &self.attr_for(inode, &stat), 0, 0, 0);
            }
            Err(e) => reply.error(reply_errno(&e)),
        }
    }
}

/// Inode of a directory entry: the directory itself for `.`, the
/// root-anchored parent chain is not tracked, so `..` reuses the
/// directory inode too.
fn entry_inode(inodes: &mut InodeTable, dir_inode: u64, dir_path: &str, entry: &DirEntry) -> u64 {
    if entry.name == "." || entry.name == ".." {
        return dir_inode;
    }
    let child_path = if dir_path == "/" {
        format!("/{}", entry.name)
    } else {
        format!("{dir_path}/{}", entry.name)
    };
    inodes.assign(&child_path)
}
