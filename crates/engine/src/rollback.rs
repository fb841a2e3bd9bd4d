// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback engine: restores a prior checkpoint over the working
//! directory, verifies the restoration, and records every attempt in the
//! append-only rollback history. Cascading rollback walks the checkpoint
//! parent chain when the most recent version itself turns out to be
//! broken.

use std::path::PathBuf;
use std::sync::Arc;

use evoseal_core::ids::VersionId;
use evoseal_core::rollback::VerificationOutcome;
use evoseal_core::{Event, EventBus, EventKind, RollbackEvent};
use evoseal_storage::{validate_restoration_target, CheckpointStore};

use crate::error::RollbackError;

pub struct RollbackEngineConfig {
    pub working_directory: PathBuf,
    pub backup_current: bool,
    pub max_cascade_attempts: u32,
}

impl Default for RollbackEngineConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            backup_current: true,
            max_cascade_attempts: 5,
        }
    }
}

/// Coordinates `CheckpointStore::restore_checkpoint_with_validation`, the
/// restoration-target safety predicate, and `RollbackHistoryStore` into the
/// single-call rollback operations the workflow coordinator drives on
/// stage failure.
pub struct RollbackEngine {
    checkpoints: Arc<CheckpointStore>,
    history: Arc<evoseal_storage::RollbackHistoryStore>,
    event_bus: EventBus,
    config: RollbackEngineConfig,
}

impl RollbackEngine {
    pub fn new(
        checkpoints: Arc<CheckpointStore>,
        history: Arc<evoseal_storage::RollbackHistoryStore>,
        event_bus: EventBus,
        config: RollbackEngineConfig,
    ) -> Self {
        Self { checkpoints, history, event_bus, config }
    }

    /// Restore `to_version` over the configured working directory, verify
    /// it, and record the attempt regardless of outcome.
    pub async fn rollback_to_version(&self, to_version: &VersionId, reason: impl Into<String>) -> Result<RollbackEvent, RollbackError> {
        let reason = reason.into();
        let mut event = RollbackEvent::new(to_version.clone(), reason.clone(), self.config.working_directory.clone());

        self.event_bus
            .publish(
                Event::new(EventKind::RollbackInitiated, "rollback_engine")
                    .insert("toVersion", to_version.as_str())
                    .insert("reason", reason.clone()),
            )
            .await;

        let cwd = std::env::current_dir()?;
        let safe_target = validate_restoration_target(&cwd, &self.config.working_directory)?;
        event.safety_validated = true;
        event.used_fallback = safe_target.used_fallback;

        let metadata = self.checkpoints.get_metadata(to_version)?;
        let outcome = match self
            .checkpoints
            .restore_checkpoint_with_validation(to_version, &safe_target.path, self.config.backup_current)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                event.success = false;
                event.error = Some(err.to_string());
                self.history.append(event.clone())?;
                self.event_bus
                    .publish(Event::new(EventKind::RollbackFailed, "rollback_engine").insert("toVersion", to_version.as_str()).insert("error", err.to_string()))
                    .await;
                return Ok(event);
            }
        };

        let verification = VerificationOutcome {
            passed: outcome.restored_files == metadata.file_count && outcome.integrity_verified,
            expected_file_count: metadata.file_count,
            actual_file_count: outcome.restored_files,
            integrity_verified: outcome.integrity_verified,
        };
        event.success = outcome.success;
        let verification_passed = verification.passed;
        event.verification = Some(verification);

        self.history.append(event.clone())?;

        let verification_kind = if verification_passed { EventKind::RollbackVerificationPassed } else { EventKind::RollbackVerificationFailed };
        self.event_bus
            .publish(Event::new(verification_kind, "rollback_engine").insert("toVersion", to_version.as_str()))
            .await;
        self.event_bus
            .publish(Event::new(EventKind::RollbackCompleted, "rollback_engine").insert("toVersion", to_version.as_str()).insert("success", event.success))
            .await;

        Ok(event)
    }

    /// Roll back `current_version` to its checkpoint parent, but only when
    /// `trigger` says to: any failed test, or a critical regression in
    /// `metrics_comparison`. A parentless version falls back to the most
    /// recently created checkpoint other than itself.
    pub async fn auto_rollback_on_failure(&self, current_version: &VersionId, trigger: AutoRollbackTrigger) -> Result<Option<RollbackEvent>, RollbackError> {
        if !trigger.should_rollback() {
            return Ok(None);
        }

        let metadata = self.checkpoints.get_metadata(current_version)?;
        let parent = match metadata.parent_id {
            Some(parent) => parent,
            None => self
                .most_recent_other_checkpoint(current_version)?
                .ok_or_else(|| RollbackError::NoParent(current_version.clone()))?,
        };

        let mut event = self.rollback_to_version(&parent, "automatic rollback after failure").await?;
        event.from_version = Some(current_version.clone());
        Ok(Some(event))
    }

    /// Newest checkpoint other than `exclude`, used as `auto_rollback_on_failure`'s
    /// fallback parent when `exclude` itself has no recorded `parentId`.
    fn most_recent_other_checkpoint(&self, exclude: &VersionId) -> Result<Option<VersionId>, RollbackError> {
        let mut checkpoints = self.checkpoints.list_checkpoints()?;
        checkpoints.retain(|c| &c.version_id != exclude);
        checkpoints.sort_by(|a, b| b.retention_key().cmp(&a.retention_key()));
        Ok(checkpoints.into_iter().next().map(|c| c.version_id))
    }

    /// Walk the checkpoint parent chain starting at `from_version`, trying
    /// each ancestor in turn until one both restores and verifies, or
    /// `max_attempts` is exhausted. Every attempted version — including ones
    /// that restored but failed post-restoration verification — is recorded
    /// in `rollback_chain`.
    pub async fn cascading_rollback(&self, from_version: &VersionId, max_attempts: u32) -> Result<CascadingRollbackOutcome, RollbackError> {
        self.event_bus
            .publish(Event::new(EventKind::CascadingRollbackStarted, "rollback_engine").insert("fromVersion", from_version.as_str()))
            .await;

        let mut current = from_version.clone();
        let mut attempts = 0u32;
        let mut chain = Vec::new();

        loop {
            let metadata = self.checkpoints.get_metadata(&current)?;
            let Some(parent) = metadata.parent_id else {
                return self.exhaust_to_recovery(from_version, chain, attempts).await;
            };

            attempts += 1;
            chain.push(parent.clone());
            let event = self.rollback_to_version(&parent, "cascading rollback").await?;
            let verified = event.verification.as_ref().map(|v| v.passed).unwrap_or(false);

            if event.success && verified {
                self.event_bus
                    .publish(
                        Event::new(EventKind::CascadingRollbackCompleted, "rollback_engine")
                            .insert("fromVersion", from_version.as_str())
                            .insert("toVersion", parent.as_str())
                            .insert("attempts", u64::from(attempts)),
                    )
                    .await;
                return Ok(CascadingRollbackOutcome {
                    success: true,
                    final_version: Some(parent),
                    rollback_chain: chain,
                    attempts,
                    recovery: None,
                });
            }

            if attempts >= max_attempts {
                return self.exhaust_to_recovery(from_version, chain, attempts).await;
            }
            current = parent;
        }
    }

    /// Every in-chain attempt is exhausted: escalate via `handle_rollback_failure`.
    /// A successful escalation (sibling checkpoint or empty safe directory)
    /// still counts as an overall success; only a fully aborted escalation
    /// surfaces as `RollbackError`.
    async fn exhaust_to_recovery(&self, from_version: &VersionId, chain: Vec<VersionId>, attempts: u32) -> Result<CascadingRollbackOutcome, RollbackError> {
        let recovery = self.handle_rollback_failure(from_version, attempts).await;
        if recovery.success {
            return Ok(CascadingRollbackOutcome {
                success: true,
                final_version: recovery.final_version.clone(),
                rollback_chain: chain,
                attempts,
                recovery: Some(recovery),
            });
        }
        Err(RollbackError::AllRecoveryStrategiesFailed { version_id: from_version.clone(), attempts })
    }

    /// Escalating recovery once every in-chain rollback attempt has failed:
    /// try a sibling checkpoint (any other checkpoint with the same
    /// parent), then fall back to restoring an empty safe directory, then
    /// give up.
    pub async fn handle_rollback_failure(&self, version_id: &VersionId, attempt_count: u32) -> RecoveryOutcome {
        let mut actions_taken = Vec::new();

        if let Some(sibling) = self.pick_sibling(version_id) {
            actions_taken.push(format!("attempting sibling checkpoint {sibling}"));
            if let Ok(event) = self.rollback_to_version(&sibling, "rollback failure recovery: sibling checkpoint").await {
                let verified = event.verification.as_ref().map(|v| v.passed).unwrap_or(false);
                if event.success && verified {
                    return RecoveryOutcome {
                        success: true,
                        strategy: RecoveryStrategy::SiblingCheckpoint,
                        actions_taken,
                        final_version: Some(sibling),
                    };
                }
                actions_taken.push(format!("sibling checkpoint {sibling} also failed to verify"));
            }
        }

        actions_taken.push("restoring an empty safe directory".to_string());
        match self.restore_empty_safe_directory().await {
            Ok(path) => {
                actions_taken.push(format!("restored empty safe directory at {}", path.display()));
                RecoveryOutcome {
                    success: true,
                    strategy: RecoveryStrategy::EmptySafeDirectory,
                    actions_taken,
                    final_version: None,
                }
            }
            Err(err) => {
                actions_taken.push(format!("abort after {attempt_count} attempt(s): {err}"));
                self.event_bus
                    .publish(
                        Event::new(EventKind::RollbackFailed, "rollback_engine")
                            .insert("versionId", version_id.as_str())
                            .insert("attempts", u64::from(attempt_count)),
                    )
                    .await;
                RecoveryOutcome {
                    success: false,
                    strategy: RecoveryStrategy::Abort,
                    actions_taken,
                    final_version: None,
                }
            }
        }
    }

    /// Any other checkpoint sharing `version_id`'s parent, preferring the
    /// most recently created.
    fn pick_sibling(&self, version_id: &VersionId) -> Option<VersionId> {
        let metadata = self.checkpoints.get_metadata(version_id).ok()?;
        let mut checkpoints = self.checkpoints.list_checkpoints().ok()?;
        checkpoints.retain(|c| &c.version_id != version_id && c.parent_id == metadata.parent_id);
        checkpoints.sort_by(|a, b| b.retention_key().cmp(&a.retention_key()));
        checkpoints.into_iter().next().map(|c| c.version_id)
    }

    async fn restore_empty_safe_directory(&self) -> Result<PathBuf, RollbackError> {
        let cwd = std::env::current_dir()?;
        let safe_target = validate_restoration_target(&cwd, &self.config.working_directory)?;
        for entry in std::fs::read_dir(&safe_target.path).map_err(RollbackError::Io)? {
            let entry = entry.map_err(RollbackError::Io)?;
            let path = entry.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(safe_target.path)
    }
}

/// Decision inputs for `auto_rollback_on_failure`: an automatic rollback
/// fires iff any test failed, or the metrics comparison (when one was run)
/// reports a critical regression.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoRollbackTrigger {
    pub any_test_failed: bool,
    pub critical_regression: bool,
}

impl AutoRollbackTrigger {
    pub fn should_rollback(&self) -> bool {
        self.any_test_failed || self.critical_regression
    }
}

/// Outcome of a fully successful `cascading_rollback`.
#[derive(Debug, Clone)]
pub struct CascadingRollbackOutcome {
    pub success: bool,
    pub final_version: Option<VersionId>,
    pub rollback_chain: Vec<VersionId>,
    pub attempts: u32,
    /// Set when the primary parent-chain walk was exhausted and
    /// `handle_rollback_failure` had to escalate to reach `final_version`.
    pub recovery: Option<RecoveryOutcome>,
}

/// Which escalation `handle_rollback_failure` used, and whether it
/// succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    SiblingCheckpoint,
    EmptySafeDirectory,
    Abort,
}

#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub success: bool,
    pub strategy: RecoveryStrategy,
    pub actions_taken: Vec<String>,
    pub final_version: Option<VersionId>,
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
