// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for KubeFS Core

use std::io;

/// Boxed error raised by a backing data or content source
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core filesystem error type
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("read-only filesystem")]
    ReadOnly,
    /// Syntactically invalid path. Never leaves the core: the virtual
    /// filesystem reports it as `NotFound`.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("backing source failed: {0}")]
    Source(#[source] SourceError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// Wrap an arbitrary collaborator failure
    pub fn from_source<E>(err: E) -> Self
    where
        E: Into<SourceError>,
    {
        FsError::Source(err.into())
    }

    /// Operating-system error number for this error
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound | FsError::InvalidPath(_) => libc::ENOENT,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::ReadOnly => libc::EROFS,
            FsError::Source(_) | FsError::Io(_) => libc::EIO,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
