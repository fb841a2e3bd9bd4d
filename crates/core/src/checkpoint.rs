// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint data model. The store that materializes these
//! records onto a filesystem tree lives in `evoseal-storage`; this crate only
//! carries the shapes so adapters/engine/storage can all agree on them.

use crate::ids::VersionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the checkpoint's content tree is stored on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// Captured `{systemInfo, modelState, evolutionState}` snapshot, taken
/// alongside a checkpoint when `captureSystemState` is requested. The core
/// treats the three fields as opaque — the embedder defines their shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemStateSnapshot {
    #[serde(default)]
    pub system_info: Value,
    #[serde(default)]
    pub model_state: Value,
    #[serde(default)]
    pub evolution_state: Value,
}

/// Persisted `metadata.json` record for one checkpoint directory.
///
/// `created_at` is the checkpoint's own snapshot time — the field the
/// retention policy and tie-breaking rule (lexicographic `version_id`) sort
/// on. `timestamp` is the *version's* own business timestamp, which may
/// predate `created_at` when a checkpoint is created after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub version_id: VersionId,
    pub parent_id: Option<VersionId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub file_count: usize,
    pub total_bytes: u64,
    pub integrity_hash: String,
    pub compression: Compression,
    pub system_state_captured: bool,
    #[serde(default)]
    pub config_snapshot: Value,
    #[serde(default)]
    pub metrics_count: usize,
}

impl CheckpointMetadata {
    /// Total ordering used by retention/backup cleanup: newest `created_at`
    /// first, ties broken by lexicographically greatest `version_id`.
    pub fn retention_key(&self) -> (chrono::DateTime<chrono::Utc>, &str) {
        (self.created_at, self.version_id.as_str())
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
