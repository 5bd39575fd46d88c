// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Cluster access for KubeFS through the `kubectl` command-line client
//!
//! [`KubectlClient`] implements both the data source (namespace and object
//! listings) and the content source (describe/logs/json/yaml) used by the
//! filesystem. Every query runs a fresh `kubectl` process; nothing is cached.

pub mod error;
pub mod kubectl;

pub use error::ClientError;
pub use kubectl::{parse_names, KubectlClient};
