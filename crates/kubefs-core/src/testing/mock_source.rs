// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Fault-injecting data source for testing error propagation
//!
//! [`FaultySource`] wraps a real [`DataSource`] and fails selected queries
//! according to a [`FailureBehavior`] policy, counting every call.

use crate::error::FsResult;
use crate::path::ResourceKind;
use crate::source::DataSource;
use crate::FsError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Custom predicate function type for fault injection
pub type FaultPredicate = Arc<dyn Fn(&str, u64) -> Option<FsError> + Send + Sync>;

/// Configurable failure behavior for source queries
#[derive(Default)]
pub enum FailureBehavior {
    /// Never fail
    #[default]
    AlwaysSucceed,

    /// Fail after N successful calls to a specific query
    FailAfter {
        op: &'static str,
        count: u64,
        error_fn: Arc<dyn Fn() -> FsError + Send + Sync>,
    },

    /// Fail the first N calls to a specific query
    FailFor {
        op: &'static str,
        count: u64,
        error_fn: Arc<dyn Fn() -> FsError + Send + Sync>,
    },

    /// Always fail a specific query
    AlwaysFail {
        op: &'static str,
        error_fn: Arc<dyn Fn() -> FsError + Send + Sync>,
    },

    /// Receives (query name, call count) and returns Some(error) to fail
    Custom(FaultPredicate),
}

/// Decorator that delegates to an inner source and injects failures
pub struct FaultySource {
    inner: Arc<dyn DataSource>,
    behavior: Mutex<FailureBehavior>,
    call_counts: Mutex<HashMap<String, AtomicU64>>,
}

impl FaultySource {
    pub fn new(inner: Arc<dyn DataSource>) -> Self {
        Self::with_behavior(inner, FailureBehavior::AlwaysSucceed)
    }

    pub fn with_behavior(inner: Arc<dyn DataSource>, behavior: FailureBehavior) -> Self {
        Self {
            inner,
            behavior: Mutex::new(behavior),
            call_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_behavior(&self, behavior: FailureBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Number of times a query has been issued
    pub fn call_count(&self, op: &str) -> u64 {
        self.call_counts
            .lock()
            .unwrap()
            .get(op)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn check_fault(&self, op: &str) -> Result<(), FsError> {
        let mut counts_guard = self.call_counts.lock().unwrap();
        let counter = counts_guard.entry(op.to_string()).or_insert_with(|| AtomicU64::new(0));
        let current_count = counter.fetch_add(1, Ordering::SeqCst);
        drop(counts_guard);

        let behavior_guard = self.behavior.lock().unwrap();
        let fail = match &*behavior_guard {
            FailureBehavior::AlwaysSucceed => None,
            FailureBehavior::FailAfter {
                op: target,
                count,
                error_fn,
            } => (op == *target && current_count >= *count).then(|| error_fn()),
            FailureBehavior::FailFor {
                op: target,
                count,
                error_fn,
            } => (op == *target && current_count < *count).then(|| error_fn()),
            FailureBehavior::AlwaysFail {
                op: target,
                error_fn,
            } => (op == *target).then(|| error_fn()),
            FailureBehavior::Custom(predicate) => predicate(op, current_count),
        };

        match fail {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl DataSource for FaultySource {
    fn list_namespaces(&self) -> FsResult<Vec<String>> {
        self.check_fault("list_namespaces")?;
        self.inner.list_namespaces()
    }

    fn list_objects(&self, namespace: &str, kind: ResourceKind) -> FsResult<Vec<String>> {
        self.check_fault("list_objects")?;
        self.inner.list_objects(namespace, kind)
    }
}

/// Failure of the kind a dead cluster connection produces
pub fn unreachable_error() -> FsError {
    FsError::from_source("the connection to the server was refused")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use crate::vfs::VirtualFileSystem;

    fn base() -> Arc<dyn DataSource> {
        Arc::new(
            StaticSource::new()
                .with_namespace("default")
                .with_object("default", ResourceKind::Pod, "nginx-1"),
        )
    }

    #[test]
    fn passthrough_counts_queries() {
        let source = FaultySource::new(base());
        VirtualFileSystem::new("/").list_children(&source).unwrap();
        VirtualFileSystem::new("/default/pod/nginx-1").attributes(&source).unwrap();
        VirtualFileSystem::new("/default/pod/nginx-1").list_children(&source).unwrap();

        assert_eq!(source.call_count("list_namespaces"), 1);
        assert_eq!(source.call_count("list_objects"), 2);
    }

    #[test]
    fn structural_queries_never_reach_the_source() {
        let source = FaultySource::with_behavior(
            base(),
            FailureBehavior::Custom(Arc::new(|_: &str, _: u64| Some(unreachable_error()))),
        );

        for path in ["/", "/default", "/default/pod", "/default/pod/x/logs"] {
            assert!(VirtualFileSystem::new(path).attributes(&source).is_ok(), "{}", path);
        }
        assert!(VirtualFileSystem::new("/default").list_children(&source).is_ok());
        assert_eq!(source.call_count("list_namespaces"), 0);
        assert_eq!(source.call_count("list_objects"), 0);
    }

    #[test]
    fn failure_is_not_reported_as_not_found() {
        let source = FaultySource::with_behavior(
            base(),
            FailureBehavior::AlwaysFail {
                op: "list_objects",
                error_fn: Arc::new(unreachable_error),
            },
        );

        let fs = VirtualFileSystem::new("/default/pod/nginx-1");
        assert!(matches!(fs.attributes(&source), Err(FsError::Source(_))));
        assert!(matches!(fs.list_children(&source), Err(FsError::Source(_))));
        // Namespace listing is unaffected
        assert!(VirtualFileSystem::new("/").list_children(&source).is_ok());
    }

    #[test]
    fn transient_failure_recovers() {
        let source = FaultySource::with_behavior(
            base(),
            FailureBehavior::FailFor {
                op: "list_namespaces",
                count: 1,
                error_fn: Arc::new(unreachable_error),
            },
        );

        let fs = VirtualFileSystem::new("/");
        assert!(fs.list_children(&source).is_err());
        assert_eq!(fs.list_children(&source).unwrap().len(), 1);
    }

    #[test]
    fn failure_after_threshold() {
        let source = FaultySource::with_behavior(
            base(),
            FailureBehavior::FailAfter {
                op: "list_objects",
                count: 2,
                error_fn: Arc::new(unreachable_error),
            },
        );

        let fs = VirtualFileSystem::new("/default/pod");
        assert!(fs.list_children(&source).is_ok());
        assert!(fs.list_children(&source).is_ok());
        assert!(fs.list_children(&source).is_err());
        assert_eq!(source.call_count("list_objects"), 3);
    }

    #[test]
    fn behavior_can_change_at_runtime() {
        let source = FaultySource::new(base());
        let fs = VirtualFileSystem::new("/");
        assert!(fs.list_children(&source).is_ok());

        source.set_behavior(FailureBehavior::AlwaysFail {
            op: "list_namespaces",
            error_fn: Arc::new(unreachable_error),
        });
        assert!(fs.list_children(&source).is_err());

        source.set_behavior(FailureBehavior::AlwaysSucceed);
        assert!(fs.list_children(&source).is_ok());
    }
}
