// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Backing data and content sources
//!
//! The virtual filesystem never talks to the cluster itself. Listings come
//! from a [`DataSource`] and action file bytes from a [`ContentSource`],
//! both passed in explicitly by the caller.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};
use crate::path::{Action, ResourceKind};

/// Live set of namespaces and objects
#[cfg_attr(test, mockall::automock)]
pub trait DataSource: Send + Sync {
    /// Namespace names, in the order the source reports them
    fn list_namespaces(&self) -> FsResult<Vec<String>>;

    /// Object names of `kind` within `namespace`, in source order
    fn list_objects(&self, namespace: &str, kind: ResourceKind) -> FsResult<Vec<String>>;
}

/// Generator for the contents of action files
pub trait ContentSource: Send + Sync {
    fn render(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        action: Action,
    ) -> FsResult<Vec<u8>>;
}

/// Object entry of a [`StaticSource`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticObject {
    pub name: String,
    /// Action name -> file content
    #[serde(default)]
    pub content: HashMap<String, String>,
}

/// Namespace entry of a [`StaticSource`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticNamespace {
    pub name: String,
    #[serde(default)]
    pub pods: Vec<StaticObject>,
    #[serde(default)]
    pub services: Vec<StaticObject>,
    #[serde(default)]
    pub replication_controllers: Vec<StaticObject>,
}

impl StaticNamespace {
    fn objects(&self, kind: ResourceKind) -> &Vec<StaticObject> {
        match kind {
            ResourceKind::Pod => &self.pods,
            ResourceKind::Service => &self.services,
            ResourceKind::ReplicationController => &self.replication_controllers,
        }
    }

    fn objects_mut(&mut self, kind: ResourceKind) -> &mut Vec<StaticObject> {
        match kind {
            ResourceKind::Pod => &mut self.pods,
            ResourceKind::Service => &mut self.services,
            ResourceKind::ReplicationController => &mut self.replication_controllers,
        }
    }
}

/// In-memory source with a fixed set of namespaces and objects.
///
/// Serves both listings and content. Objects without explicit content for an
/// action render a one-line placeholder.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticSource {
    #[serde(default)]
    pub namespaces: Vec<StaticNamespace>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture from a JSON file
    pub fn from_json_file(path: &Path) -> FsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(FsError::from_source)
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace_entry(namespace);
        self
    }

    pub fn with_object(mut self, namespace: &str, kind: ResourceKind, name: &str) -> Self {
        self.object_entry(namespace, kind, name);
        self
    }

    pub fn with_content(
        mut self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        action: Action,
        content: &str,
    ) -> Self {
        self.object_entry(namespace, kind, name)
            .content
            .insert(action.name().to_string(), content.to_string());
        self
    }

    fn namespace_entry(&mut self, namespace: &str) -> &mut StaticNamespace {
        let idx = match self.namespaces.iter().position(|ns| ns.name == namespace) {
            Some(idx) => idx,
            None => {
                self.namespaces.push(StaticNamespace {
                    name: namespace.to_string(),
                    ..Default::default()
                });
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[idx]
    }

    fn object_entry(&mut self, namespace: &str, kind: ResourceKind, name: &str) -> &mut StaticObject {
        let objects = self.namespace_entry(namespace).objects_mut(kind);
        let idx = match objects.iter().position(|obj| obj.name == name) {
            Some(idx) => idx,
            None => {
                objects.push(StaticObject {
                    name: name.to_string(),
                    ..Default::default()
                });
                objects.len() - 1
            }
        };
        &mut objects[idx]
    }

    fn find_object(&self, namespace: &str, kind: ResourceKind, name: &str) -> Option<&StaticObject> {
        self.namespaces
            .iter()
            .find(|ns| ns.name == namespace)?
            .objects(kind)
            .iter()
            .find(|obj| obj.name == name)
    }
}

impl DataSource for StaticSource {
    fn list_namespaces(&self) -> FsResult<Vec<String>> {
        Ok(self.namespaces.iter().map(|ns| ns.name.clone()).collect())
    }

    fn list_objects(&self, namespace: &str, kind: ResourceKind) -> FsResult<Vec<String>> {
        // Unknown namespaces list as empty, the same as the cluster client
        Ok(self
            .namespaces
            .iter()
            .find(|ns| ns.name == namespace)
            .map(|ns| ns.objects(kind).iter().map(|obj| obj.name.clone()).collect())
            .unwrap_or_default())
    }
}

impl ContentSource for StaticSource {
    fn render(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
        action: Action,
    ) -> FsResult<Vec<u8>> {
        let object = self.find_object(namespace, kind, name).ok_or(FsError::NotFound)?;
        let text = match object.content.get(action.name()) {
            Some(text) => text.clone(),
            None => format!("{} {}/{} -n {}\n", action, kind, name, namespace),
        };
        Ok(text.into_bytes())
    }
}
