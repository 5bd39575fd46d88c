// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! KubeFS Core: path resolution and filesystem semantics
//!
//! Exposes cluster resources as a read-only tree:
//! `/<namespace>/<kind>/<object>/<action>`. This crate classifies paths and
//! answers attribute and listing queries against an injected data source.
//! Mounting and talking to the cluster live in other crates.

pub mod config;
pub mod error;
pub mod path;
pub mod source;
pub mod testing;
pub mod types;
pub mod vfs;

pub use config::{CachePolicy, ClusterConfig, FsConfig};
pub use error::{FsError, FsResult, SourceError};
pub use path::{Action, Depth, Location, ResourceKind, MAX_DEPTH};
pub use source::{ContentSource, DataSource, StaticNamespace, StaticObject, StaticSource};
pub use types::{DirectoryEntry, FileAttributes, FileKind, DIR_PERM, FILE_PERM, FIXED_ACTION_SIZE};
pub use vfs::VirtualFileSystem;
