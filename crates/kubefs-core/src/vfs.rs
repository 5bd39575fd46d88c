// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Virtual filesystem implementation for KubeFS Core
//!
//! A [`VirtualFileSystem`] is built for the single path a filesystem call
//! concerns and answers attribute and listing queries for it. It holds no
//! state beyond that path; the data source is passed to every query.

use tracing::{debug, trace};

use crate::error::{FsError, FsResult};
use crate::path::{Action, Location, ResourceKind};
use crate::source::DataSource;
use crate::types::{DirectoryEntry, FileAttributes, FileKind};

/// Attribute and listing view of one path
#[derive(Clone, Debug)]
pub struct VirtualFileSystem {
    path: String,
}

impl VirtualFileSystem {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the target path. Malformed paths are reported as absent.
    pub fn resolve(&self) -> FsResult<Location> {
        Location::parse(&self.path).map_err(|err| {
            debug!(path = %self.path, error = %err, "path does not resolve");
            FsError::NotFound
        })
    }

    /// Attributes of the target path.
    ///
    /// Root, namespace and kind directories always exist. Object directories
    /// exist only when the data source lists the object. Action files are
    /// never checked against the source.
    pub fn attributes<S>(&self, source: &S) -> FsResult<FileAttributes>
    where
        S: DataSource + ?Sized,
    {
        let location = self.resolve()?;
        trace!(path = %self.path, depth = %location.depth(), "attributes");

        match &location {
            Location::Root | Location::Namespace { .. } | Location::Kind { .. } => {
                Ok(FileAttributes::directory())
            }
            Location::Object {
                namespace,
                kind,
                name,
            } => {
                ensure_object_exists(source, namespace, *kind, name)?;
                Ok(FileAttributes::directory())
            }
            Location::Action { .. } => Ok(FileAttributes::action_file()),
        }
    }

    /// Children of the target directory, in listing order
    pub fn list_children<S>(&self, source: &S) -> FsResult<Vec<DirectoryEntry>>
    where
        S: DataSource + ?Sized,
    {
        let location = self.resolve()?;
        trace!(path = %self.path, depth = %location.depth(), "list_children");

        let names: Vec<String> = match &location {
            Location::Root => source.list_namespaces()?,
            Location::Namespace { .. } => ResourceKind::ALL
                .iter()
                .map(|kind| kind.short_name().to_string())
                .collect(),
            Location::Kind { namespace, kind } => source.list_objects(namespace, *kind)?,
            Location::Object {
                namespace,
                kind,
                name,
            } => {
                ensure_object_exists(source, namespace, *kind, name)?;
                Action::ALL.iter().map(|action| action.name().to_string()).collect()
            }
            Location::Action { .. } => return Err(FsError::NotADirectory),
        };

        Ok(names.into_iter().map(DirectoryEntry::new).collect())
    }

    /// Node type of the children of the target path, `None` for files
    pub fn child_kind(&self) -> FsResult<Option<FileKind>> {
        Ok(self.resolve()?.child_file_kind())
    }
}

fn ensure_object_exists<S>(source: &S, namespace: &str, kind: ResourceKind, name: &str) -> FsResult<()>
where
    S: DataSource + ?Sized,
{
    let objects = source.list_objects(namespace, kind)?;
    if objects.iter().any(|object| object == name) {
        Ok(())
    } else {
        debug!(namespace, kind = %kind, name, "object not listed by source");
        Err(FsError::NotFound)
    }
}
