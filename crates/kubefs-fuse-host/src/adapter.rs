// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! KubeFS FUSE adapter implementation
//!
//! Maps FUSE operations onto `VirtualFileSystem` queries. Inodes are handed
//! out per path on lookup/readdir; every request resolves its path afresh.

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
compile_error!("This module requires the 'fuse' feature on Linux");

use fuser::{
    consts::FOPEN_DIRECT_IO, FileAttr, FileType, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, Request, FUSE_ROOT_ID,
};
use kubefs_core::{
    error::FsResult, CachePolicy, ContentSource, DataSource, FileAttributes, FileKind, FsError,
    Location, VirtualFileSystem,
};
use libc::{c_int, ENAMETOOLONG};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Maximum single path component length to guard against overly long names
const NAME_MAX: usize = 255;

/// First handle id given to an opened action file
const FIRST_HANDLE: u64 = 1;

/// KubeFS FUSE filesystem adapter
pub struct KubeFsFuse {
    /// Namespace and object listings
    source: Arc<dyn DataSource>,
    /// Action file content
    content: Arc<dyn ContentSource>,
    /// TTL for attribute cache responses
    attr_ttl: Duration,
    /// TTL for directory entry cache responses
    entry_ttl: Duration,
    /// inode -> path
    inodes: HashMap<u64, String>,
    /// path -> inode
    paths: HashMap<String, u64>,
    next_inode: u64,
    /// Content generated at open, keyed by file handle
    handles: HashMap<u64, Vec<u8>>,
    next_fh: u64,
    uid: u32,
    gid: u32,
    /// Timestamp reported for every node
    mounted_at: SystemTime,
}

impl KubeFsFuse {
    pub fn new(
        cache: &CachePolicy,
        source: Arc<dyn DataSource>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        let mut inodes = HashMap::new();
        let mut paths = HashMap::new();
        inodes.insert(FUSE_ROOT_ID, "/".to_string());
        paths.insert("/".to_string(), FUSE_ROOT_ID);

        // SAFETY: getuid/getgid cannot fail and touch no memory
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };

        Self {
            source,
            content,
            attr_ttl: Duration::from_millis(cache.attr_ttl_ms as u64),
            entry_ttl: Duration::from_millis(cache.entry_ttl_ms as u64),
            inodes,
            paths,
            next_inode: FUSE_ROOT_ID + 1,
            handles: HashMap::new(),
            next_fh: FIRST_HANDLE,
            uid,
            gid,
            mounted_at: SystemTime::now(),
        }
    }

    fn inode_to_path(&self, ino: u64) -> FsResult<&str> {
        self.inodes.get(&ino).map(String::as_str).ok_or(FsError::NotFound)
    }

    fn get_or_alloc_inode(&mut self, path: &str) -> u64 {
        if let Some(&inode) = self.paths.get(path) {
            return inode;
        }
        let inode = self.next_inode;
        self.next_inode += 1;
        self.paths.insert(path.to_string(), inode);
        self.inodes.insert(inode, path.to_string());
        inode
    }

    /// Inode reported by readdir: the known one, or an unrecorded number.
    ///
    /// readdir does not raise the kernel lookup count, so no forget ever
    /// follows; only lookup may add table entries.
    fn readdir_inode(&mut self, path: &str) -> u64 {
        if let Some(&inode) = self.paths.get(path) {
            return inode;
        }
        let inode = self.next_inode;
        self.next_inode += 1;
        inode
    }

    fn forget_inode(&mut self, ino: u64) {
        if ino == FUSE_ROOT_ID {
            return;
        }
        if let Some(path) = self.inodes.remove(&ino) {
            self.paths.remove(&path);
        }
    }

    fn child_path(parent: &str, name: &str) -> String {
        if parent.ends_with('/') {
            format!("{}{}", parent, name)
        } else {
            format!("{}/{}", parent, name)
        }
    }

    fn parent_path(path: &str) -> &str {
        match path.trim_end_matches('/').rsplit_once('/') {
            Some(("", _)) | None => "/",
            Some((parent, _)) => parent,
        }
    }

    fn attr_to_fuse(&self, attr: &FileAttributes, ino: u64) -> FileAttr {
        let kind = match attr.kind {
            FileKind::Directory => FileType::Directory,
            FileKind::Regular => FileType::RegularFile,
        };

        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind,
            perm: attr.perm,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    /// Resolve `name` beneath `parent`, allocating an inode when it exists
    fn lookup_entry(&mut self, parent: u64, name: &OsStr) -> FsResult<FileAttr> {
        let name = name.to_str().ok_or(FsError::NotFound)?;
        let path = Self::child_path(self.inode_to_path(parent)?, name);
        let attr = VirtualFileSystem::new(path.as_str()).attributes(self.source.as_ref())?;
        let ino = self.get_or_alloc_inode(&path);
        Ok(self.attr_to_fuse(&attr, ino))
    }

    fn attr_for_inode(&self, ino: u64) -> FsResult<FileAttr> {
        let path = self.inode_to_path(ino)?;
        let attr = VirtualFileSystem::new(path).attributes(self.source.as_ref())?;
        Ok(self.attr_to_fuse(&attr, ino))
    }

    /// `.`, `..`, then the listed children of a directory inode
    fn directory_entries(&mut self, ino: u64) -> FsResult<Vec<(u64, FileType, String)>> {
        let path = self.inode_to_path(ino)?.to_string();
        let fs = VirtualFileSystem::new(path.as_str());
        let children = fs.list_children(self.source.as_ref())?;
        let child_type = match fs.child_kind()? {
            Some(FileKind::Regular) => FileType::RegularFile,
            Some(FileKind::Directory) => FileType::Directory,
            None => return Err(FsError::NotADirectory),
        };

        let parent_ino = self.readdir_inode(Self::parent_path(&path));
        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push((ino, FileType::Directory, ".".to_string()));
        entries.push((parent_ino, FileType::Directory, "..".to_string()));
        for child in children {
            let child_ino = self.readdir_inode(&Self::child_path(&path, &child.name));
            entries.push((child_ino, child_type, child.name));
        }
        Ok(entries)
    }

    /// Entries past `offset`, each paired with the offset that resumes after it
    fn entries_after(
        entries: Vec<(u64, FileType, String)>,
        offset: i64,
    ) -> impl Iterator<Item = (i64, u64, FileType, String)> {
        let skip = usize::try_from(offset).unwrap_or(0);
        entries
            .into_iter()
            .enumerate()
            .skip(skip)
            .map(|(i, (ino, file_type, name))| ((i + 1) as i64, ino, file_type, name))
    }

    /// Generate the content of an action file and park it under a new handle
    fn open_action(&mut self, ino: u64, flags: i32) -> FsResult<u64> {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            return Err(FsError::ReadOnly);
        }

        let path = self.inode_to_path(ino)?;
        let location = VirtualFileSystem::new(path).resolve()?;
        let Location::Action {
            namespace,
            kind,
            name,
            action,
        } = location
        else {
            return Err(FsError::IsADirectory);
        };

        let data = self.content.render(&namespace, kind, &name, action)?;
        let fh = self.next_fh;
        self.next_fh += 1;
        debug!(ino, fh, bytes = data.len(), "generated action content");
        self.handles.insert(fh, data);
        Ok(fh)
    }

    fn read_handle(&self, fh: u64, offset: i64, size: u32) -> FsResult<&[u8]> {
        let data = self.handles.get(&fh).ok_or(FsError::NotFound)?;
        let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(size as usize).min(data.len());
        Ok(&data[start..end])
    }

    fn reply_errno(op: &str, ino: u64, err: &FsError) -> c_int {
        match err {
            FsError::Source(_) | FsError::Io(_) => warn!(op, ino, error = %err, "request failed"),
            _ => debug!(op, ino, error = %err, "request failed"),
        }
        err.errno()
    }
}

impl fuser::Filesystem for KubeFsFuse {
    fn init(&mut self, _req: &Request, _config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        info!(
            "KubeFS FUSE adapter initialized (attr_ttl={:?}, entry_ttl={:?})",
            self.attr_ttl, self.entry_ttl
        );
        Ok(())
    }

    fn destroy(&mut self) {
        info!("KubeFS FUSE adapter destroyed");
    }

    fn forget(&mut self, _req: &Request, ino: u64, _nlookup: u64) {
        self.forget_inode(ino);
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        if name.len() > NAME_MAX {
            reply.error(ENAMETOOLONG);
            return;
        }

        match self.lookup_entry(parent, name) {
            Ok(attr) => reply.entry(&self.entry_ttl, &attr, 0),
            Err(err) => reply.error(Self::reply_errno("lookup", parent, &err)),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.attr_for_inode(ino) {
            Ok(attr) => reply.attr(&self.attr_ttl, &attr),
            Err(err) => reply.error(Self::reply_errno("getattr", ino, &err)),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.open_action(ino, flags) {
            // Content is shorter than the advertised size; bypass the page cache
            Ok(fh) => reply.opened(fh, FOPEN_DIRECT_IO),
            Err(err) => reply.error(Self::reply_errno("open", ino, &err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_handle(fh, offset, size) {
            Ok(data) => reply.data(data),
            Err(err) => reply.error(Self::reply_errno("read", ino, &err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.handles.remove(&fh);
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        match self.directory_entries(ino) {
            Ok(entries) => {
                for (next, entry_ino, file_type, name) in Self::entries_after(entries, offset) {
                    if reply.add(entry_ino, next, file_type, name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(err) => reply.error(Self::reply_errno("readdir", ino, &err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubefs_core::{Action, ResourceKind, StaticSource};

    fn adapter() -> KubeFsFuse {
        let source = Arc::new(
            StaticSource::new()
                .with_namespace("default")
                .with_object("default", ResourceKind::Pod, "nginx-1")
                .with_content(
                    "default",
                    ResourceKind::Pod,
                    "nginx-1",
                    Action::Logs,
                    "line one\nline two\n",
                ),
        );
        KubeFsFuse::new(&CachePolicy::default(), source.clone(), source)
    }

    fn lookup_path(fs: &mut KubeFsFuse, path: &str) -> FsResult<FileAttr> {
        let mut attr = fs.attr_for_inode(FUSE_ROOT_ID)?;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            attr = fs.lookup_entry(attr.ino, OsStr::new(name))?;
        }
        Ok(attr)
    }

    #[test]
    fn cache_ttls_follow_config() {
        let source = Arc::new(StaticSource::new());
        let cache = CachePolicy {
            attr_ttl_ms: 1500,
            entry_ttl_ms: 2500,
        };
        let fuse = KubeFsFuse::new(&cache, source.clone(), source);
        assert_eq!(fuse.attr_ttl, Duration::from_millis(1500));
        assert_eq!(fuse.entry_ttl, Duration::from_millis(2500));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(KubeFsFuse::child_path("/", "default"), "/default");
        assert_eq!(KubeFsFuse::child_path("/default", "pod"), "/default/pod");
        assert_eq!(KubeFsFuse::parent_path("/default/pod"), "/default");
        assert_eq!(KubeFsFuse::parent_path("/default"), "/");
        assert_eq!(KubeFsFuse::parent_path("/"), "/");
    }

    #[test]
    fn root_attributes() {
        let fs = adapter();
        let attr = fs.attr_for_inode(FUSE_ROOT_ID).unwrap();
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.perm, 0o555);
        assert_eq!(attr.nlink, 2);
    }

    #[test]
    fn lookup_walks_the_hierarchy() {
        let mut fs = adapter();
        let attr = lookup_path(&mut fs, "/default/pod/nginx-1/logs").unwrap();
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.perm, 0o444);
        assert_eq!(attr.size, 50_000);

        // Same path, same inode
        let again = lookup_path(&mut fs, "/default/pod/nginx-1/logs").unwrap();
        assert_eq!(attr.ino, again.ino);
    }

    #[test]
    fn lookup_of_unknown_object_fails_with_enoent() {
        let mut fs = adapter();
        let err = lookup_path(&mut fs, "/default/pod/ghost").unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[test]
    fn readdir_lists_dot_entries_and_children() {
        let mut fs = adapter();
        let pod_dir = lookup_path(&mut fs, "/default/pod").unwrap();
        let entries = fs.directory_entries(pod_dir.ino).unwrap();
        let names: Vec<&str> = entries.iter().map(|(_, _, n)| n.as_str()).collect();
        assert_eq!(names, [".", "..", "nginx-1"]);
        assert_eq!(entries[2].1, FileType::Directory);

        let object = lookup_path(&mut fs, "/default/pod/nginx-1").unwrap();
        let entries = fs.directory_entries(object.ino).unwrap();
        assert_eq!(entries.len(), 6);
        assert!(entries[2..].iter().all(|(_, t, _)| *t == FileType::RegularFile));
        assert_eq!(entries[1].0, pod_dir.ino);
    }

    #[test]
    fn listing_churning_pods_keeps_the_inode_table_bounded() {
        let mut fs = adapter();
        let baseline = fs.inodes.len();

        for generation in 0..50 {
            let mut source = StaticSource::new().with_namespace("default");
            for pod in 0..20 {
                source = source.with_object(
                    "default",
                    ResourceKind::Pod,
                    &format!("web-{}-{}", generation, pod),
                );
            }
            fs.source = Arc::new(source);

            let ns = lookup_path(&mut fs, "/default").unwrap();
            let pod_dir = lookup_path(&mut fs, "/default/pod").unwrap();
            let entries = fs.directory_entries(pod_dir.ino).unwrap();
            assert_eq!(entries.len(), 22);
            fs.forget_inode(pod_dir.ino);
            fs.forget_inode(ns.ino);
        }

        assert_eq!(fs.inodes.len(), baseline);
        assert_eq!(fs.paths.len(), baseline);
    }

    #[test]
    fn listed_children_are_not_recorded_until_looked_up() {
        let mut fs = adapter();
        let pod_dir = lookup_path(&mut fs, "/default/pod").unwrap();
        let entries = fs.directory_entries(pod_dir.ino).unwrap();
        assert!(!fs.paths.contains_key("/default/pod/nginx-1"));

        let object = lookup_path(&mut fs, "/default/pod/nginx-1").unwrap();
        assert_ne!(object.ino, entries[2].0);
        let entries = fs.directory_entries(pod_dir.ino).unwrap();
        assert_eq!(entries[2].0, object.ino);
    }

    #[test]
    fn readdir_resumes_from_offset() {
        let mut fs = adapter();
        let object = lookup_path(&mut fs, "/default/pod/nginx-1").unwrap();
        let entries = fs.directory_entries(object.ino).unwrap();

        let all: Vec<_> = KubeFsFuse::entries_after(entries.clone(), 0).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].0, 1);
        assert_eq!(all[0].3, ".");

        // Kernel buffer filled after ".." and "describe"; next call passes 3
        let rest: Vec<_> = KubeFsFuse::entries_after(entries.clone(), all[2].0).collect();
        let names: Vec<&str> = rest.iter().map(|(_, _, _, n)| n.as_str()).collect();
        assert_eq!(names, ["logs", "json", "yaml"]);
        assert_eq!(rest.iter().map(|e| e.0).collect::<Vec<_>>(), [4, 5, 6]);

        assert_eq!(KubeFsFuse::entries_after(entries.clone(), 6).count(), 0);
        assert_eq!(KubeFsFuse::entries_after(entries, 100).count(), 0);
    }

    #[test]
    fn readdir_on_action_is_enotdir() {
        let mut fs = adapter();
        let file = lookup_path(&mut fs, "/default/pod/nginx-1/json").unwrap();
        let err = fs.directory_entries(file.ino).unwrap_err();
        assert_eq!(err.errno(), libc::ENOTDIR);
    }

    #[test]
    fn open_and_read_action_content() {
        let mut fs = adapter();
        let file = lookup_path(&mut fs, "/default/pod/nginx-1/logs").unwrap();
        let fh = fs.open_action(file.ino, libc::O_RDONLY).unwrap();

        assert_eq!(fs.read_handle(fh, 0, 4096).unwrap(), b"line one\nline two\n");
        assert_eq!(fs.read_handle(fh, 5, 3).unwrap(), b"one");
        assert!(fs.read_handle(fh, 1000, 10).unwrap().is_empty());
    }

    #[test]
    fn open_for_write_is_rejected() {
        let mut fs = adapter();
        let file = lookup_path(&mut fs, "/default/pod/nginx-1/yaml").unwrap();
        let err = fs.open_action(file.ino, libc::O_WRONLY).unwrap_err();
        assert_eq!(err.errno(), libc::EROFS);
        let err = fs.open_action(file.ino, libc::O_RDWR).unwrap_err();
        assert_eq!(err.errno(), libc::EROFS);
    }

    #[test]
    fn open_directory_is_eisdir() {
        let mut fs = adapter();
        let dir = lookup_path(&mut fs, "/default").unwrap();
        let err = fs.open_action(dir.ino, libc::O_RDONLY).unwrap_err();
        assert_eq!(err.errno(), libc::EISDIR);
    }

    #[test]
    fn forgotten_inodes_are_unknown() {
        let mut fs = adapter();
        let dir = lookup_path(&mut fs, "/default").unwrap();
        fs.forget_inode(dir.ino);
        assert_eq!(fs.attr_for_inode(dir.ino).unwrap_err().errno(), libc::ENOENT);

        fs.forget_inode(FUSE_ROOT_ID);
        assert!(fs.attr_for_inode(FUSE_ROOT_ID).is_ok());
    }
}
