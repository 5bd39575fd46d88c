// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path resolution for the namespace → kind → object → action hierarchy
//!
//! A raw path such as `/default/pod/nginx-1/logs` is split into its non-empty
//! segments and classified by segment count. Kind and action segments are
//! checked against their closed sets here; whether a namespace or object
//! actually exists is left to the virtual filesystem.

use std::fmt;
use std::str::FromStr;

use crate::error::{FsError, FsResult};
use crate::types::FileKind;

/// Deepest legal segment count (namespace/kind/object/action)
pub const MAX_DEPTH: usize = 4;

/// Resource kinds exposed beneath every namespace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Service,
    ReplicationController,
}

impl ResourceKind {
    /// All kinds, in directory listing order
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Pod,
        ResourceKind::Service,
        ResourceKind::ReplicationController,
    ];

    /// Canonical directory name
    pub fn short_name(self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "svc",
            ResourceKind::ReplicationController => "rc",
        }
    }

    /// Plural resource name understood by the cluster client
    pub fn resource_name(self) -> &'static str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::Service => "services",
            ResourceKind::ReplicationController => "replicationcontrollers",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for ResourceKind {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.short_name() == s)
            .ok_or_else(|| FsError::InvalidPath(format!("unknown resource kind '{}'", s)))
    }
}

/// Generated views of a single object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Describe,
    Logs,
    Json,
    Yaml,
}

impl Action {
    /// All actions, in directory listing order
    pub const ALL: [Action; 4] = [Action::Describe, Action::Logs, Action::Json, Action::Yaml];

    pub fn name(self) -> &'static str {
        match self {
            Action::Describe => "describe",
            Action::Logs => "logs",
            Action::Json => "json",
            Action::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| FsError::InvalidPath(format!("unknown action '{}'", s)))
    }
}

/// Depth of a location in the hierarchy, equal to its segment count
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Depth {
    Root,
    Namespace,
    Kind,
    Object,
    Action,
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Depth::Root => "root",
            Depth::Namespace => "namespace",
            Depth::Kind => "kind",
            Depth::Object => "object",
            Depth::Action => "action",
        };
        f.write_str(name)
    }
}

/// Parsed, validated location of a path.
///
/// Each variant carries exactly the fields its depth requires, so a
/// descriptor cannot be constructed with a missing or extra component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Root,
    Namespace {
        namespace: String,
    },
    Kind {
        namespace: String,
        kind: ResourceKind,
    },
    Object {
        namespace: String,
        kind: ResourceKind,
        name: String,
    },
    Action {
        namespace: String,
        kind: ResourceKind,
        name: String,
        action: Action,
    },
}

impl Location {
    /// Parse a slash-separated path. Empty segments are ignored.
    pub fn parse(path: &str) -> FsResult<Location> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let location = match segments.as_slice() {
            [] => Location::Root,
            [namespace] => Location::Namespace {
                namespace: namespace.to_string(),
            },
            [namespace, kind] => Location::Kind {
                namespace: namespace.to_string(),
                kind: kind.parse()?,
            },
            [namespace, kind, name] => Location::Object {
                namespace: namespace.to_string(),
                kind: kind.parse()?,
                name: name.to_string(),
            },
            [namespace, kind, name, action] => Location::Action {
                namespace: namespace.to_string(),
                kind: kind.parse()?,
                name: name.to_string(),
                action: action.parse()?,
            },
            _ => {
                return Err(FsError::InvalidPath(format!(
                    "{} segments exceed maximum depth {}",
                    segments.len(),
                    MAX_DEPTH
                )))
            }
        };

        Ok(location)
    }

    pub fn depth(&self) -> Depth {
        match self {
            Location::Root => Depth::Root,
            Location::Namespace { .. } => Depth::Namespace,
            Location::Kind { .. } => Depth::Kind,
            Location::Object { .. } => Depth::Object,
            Location::Action { .. } => Depth::Action,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Location::Root => None,
            Location::Namespace { namespace }
            | Location::Kind { namespace, .. }
            | Location::Object { namespace, .. }
            | Location::Action { namespace, .. } => Some(namespace),
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Location::Kind { kind, .. }
            | Location::Object { kind, .. }
            | Location::Action { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn object_name(&self) -> Option<&str> {
        match self {
            Location::Object { name, .. } | Location::Action { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<Action> {
        match self {
            Location::Action { action, .. } => Some(*action),
            _ => None,
        }
    }

    /// Whether this location is a regular file rather than a directory
    pub fn is_file(&self) -> bool {
        self.depth() == Depth::Action
    }

    /// Node type of this location's children, `None` for action files
    pub fn child_file_kind(&self) -> Option<FileKind> {
        match self.depth() {
            Depth::Root | Depth::Namespace | Depth::Kind => Some(FileKind::Directory),
            Depth::Object => Some(FileKind::Regular),
            Depth::Action => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Root => f.write_str("/"),
            Location::Namespace { namespace } => write!(f, "/{}", namespace),
            Location::Kind { namespace, kind } => write!(f, "/{}/{}", namespace, kind),
            Location::Object {
                namespace,
                kind,
                name,
            } => write!(f, "/{}/{}/{}", namespace, kind, name),
            Location::Action {
                namespace,
                kind,
                name,
                action,
            } => write!(f, "/{}/{}/{}/{}", namespace, kind, name, action),
        }
    }
}
