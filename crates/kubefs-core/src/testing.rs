// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test-only utilities and mock implementations for KubeFS Core
//!
//! This module provides fault-injecting wrappers around data sources so the
//! virtual filesystem can be exercised against a misbehaving cluster.

#[cfg(test)]
pub mod mock_source;
