// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for KubeFS

/// Size advertised for every action file.
///
/// Content is only generated on read, so its real length is unknown when
/// attributes are requested. Reads return the real (shorter) content.
pub const FIXED_ACTION_SIZE: u64 = 50_000;

/// Permission bits for structural directories (r-xr-xr-x)
pub const DIR_PERM: u16 = 0o555;

/// Permission bits for action files (r--r--r--)
pub const FILE_PERM: u16 = 0o444;

/// Node type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    Regular,
}

/// File attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttributes {
    pub kind: FileKind,
    pub perm: u16,
    pub nlink: u32,
    pub size: u64,
}

impl FileAttributes {
    pub fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            perm: DIR_PERM,
            nlink: 2,
            size: 0,
        }
    }

    pub fn action_file() -> Self {
        Self {
            kind: FileKind::Regular,
            perm: FILE_PERM,
            nlink: 1,
            size: FIXED_ACTION_SIZE,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Full `st_mode` value, type bits included
    pub fn mode(&self) -> u32 {
        let type_bits = match self.kind {
            FileKind::Directory => libc::S_IFDIR,
            FileKind::Regular => libc::S_IFREG,
        };
        type_bits as u32 | self.perm as u32
    }
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PartialEq<&str> for DirectoryEntry {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}
