// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error domains for the engine crate. `WorkflowError` is the top-level
//! type the coordinator surfaces; it aggregates the others via `#[from]`.

use evoseal_core::ids::VersionId;

/// Errors a `RepositoryCollaborator` implementation can return.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("merge conflict in {conflicts:?}")]
    Conflict { conflicts: Vec<String> },

    #[error("git command `{command}` failed (status {status:?}): {stderr}")]
    Command {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Errors a stage callback (analyze/generate/adapt/evaluate/validate) can
/// return. `Conflict`/`Transport`/`Timeout` are retriable by the
/// coordinator's stage-attempt loop; `Fatal` is not.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("stage timed out")]
    Timeout,

    #[error("unrecoverable stage failure: {0}")]
    Fatal(String),
}

impl StageError {
    /// True for failures the coordinator should retry with backoff rather
    /// than immediately exhaust the attempt budget.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StageError::Transport(_) | StageError::Timeout | StageError::Repo(RepoError::Conflict { .. })
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error("critical regression detected in {metric}: {change_pct:.1}% change")]
    CriticalRegression { metric: String, change_pct: f64 },

    #[error(transparent)]
    Storage(#[from] evoseal_storage::StorageError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),
}

#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    #[error(transparent)]
    Storage(#[from] evoseal_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no checkpoint available to roll back to from {0}")]
    NoParent(VersionId),

    #[error("all recovery strategies failed for {version_id} after {attempts} attempt(s)")]
    AllRecoveryStrategiesFailed { version_id: VersionId, attempts: u32 },
}

/// Top-level error the coordinator surfaces to its caller.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("missing required configuration: {0}")]
    Config(String),

    #[error("invalid stage transition: {from:?} -> {to}")]
    InvalidTransition {
        from: Option<evoseal_core::WorkflowStage>,
        to: evoseal_core::WorkflowStage,
    },

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    Storage(#[from] evoseal_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize workflow state: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("stage attempts exhausted for {stage}: {source}")]
    StageExhausted {
        stage: evoseal_core::WorkflowStage,
        #[source]
        source: StageError,
    },
}
