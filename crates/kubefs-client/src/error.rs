// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the kubectl client

use kubefs_core::FsError;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("{0} is not installed or not on PATH")]
    NotAvailable(String),
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ClientError> for FsError {
    fn from(err: ClientError) -> Self {
        FsError::from_source(err)
    }
}
