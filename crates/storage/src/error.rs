// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by the checkpoint, metrics, baseline, and rollback
//! history stores.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize {what}: {source}")]
    Serde {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint for version {0} not found")]
    CheckpointNotFound(String),

    #[error("relative path {0:?} escapes the checkpoint root")]
    PathTraversal(String),

    #[error("integrity check failed for version {version_id}: expected {expected}, computed {computed}")]
    IntegrityMismatch {
        version_id: String,
        expected: String,
        computed: String,
    },

    #[error("metrics entry {0:?} not found")]
    MetricsNotFound(String),

    #[error("baseline {0:?} not found")]
    BaselineNotFound(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.into();
    move |source| StorageError::Io { path, source }
}
