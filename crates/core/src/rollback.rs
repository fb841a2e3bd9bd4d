// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback history data model.

use crate::ids::VersionId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of the post-restoration integrity re-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub passed: bool,
    pub expected_file_count: usize,
    pub actual_file_count: usize,
    pub integrity_verified: bool,
}

/// One append-only entry in `rollback_history.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackEvent {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub from_version: Option<VersionId>,
    pub to_version: VersionId,
    pub reason: String,
    pub success: bool,
    pub working_directory: PathBuf,
    pub safety_validated: bool,
    /// Set when the restoration-target safety predicate
    /// redirected the restore to `<cwd>/.evoseal/rollback_target` instead of
    /// the originally requested, denylisted directory.
    pub used_fallback: bool,
    pub verification: Option<VerificationOutcome>,
    pub error: Option<String>,
}

impl RollbackEvent {
    pub fn new(to_version: VersionId, reason: impl Into<String>, working_directory: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            from_version: None,
            to_version,
            reason: reason.into(),
            success: false,
            working_directory,
            safety_validated: false,
            used_fallback: false,
            verification: None,
            error: None,
        }
    }
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
