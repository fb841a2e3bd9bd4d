// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state machine data model.

use serde::{Deserialize, Serialize};

/// Overall run state of the workflow coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    NotStarted,
    Running,
    Paused,
    Completed,
    Failed,
}

crate::simple_display! {
    WorkflowState {
        NotStarted => "not_started",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Ordered per-iteration stage. `ALL` is the canonical sequence;
/// [`WorkflowStage::next`] and [`WorkflowStage::is_valid_transition`] encode
/// the monotonicity invariant: a transition `s -> s'` is legal iff `s'` is
/// `s`'s successor, a retry of `s` itself, or the very first transition into
/// `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Initializing,
    Analyzing,
    Generating,
    Adapting,
    Evaluating,
    Validating,
    Finalizing,
}

crate::simple_display! {
    WorkflowStage {
        Initializing => "initializing",
        Analyzing => "analyzing",
        Generating => "generating",
        Adapting => "adapting",
        Evaluating => "evaluating",
        Validating => "validating",
        Finalizing => "finalizing",
    }
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 7] = [
        Self::Initializing,
        Self::Analyzing,
        Self::Generating,
        Self::Adapting,
        Self::Evaluating,
        Self::Validating,
        Self::Finalizing,
    ];

    /// The iteration body that repeats once per `runWorkflow` iteration,
    /// excluding the one-time `initializing`/`finalizing` bookends.
    pub const ITERATION: [WorkflowStage; 5] =
        [Self::Analyzing, Self::Generating, Self::Adapting, Self::Evaluating, Self::Validating];

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The stage that legally follows this one, or `None` if this is the
    /// terminal stage (`finalizing` has no successor in the linear
    /// sequence; the coordinator loops `validating -> analyzing` itself
    /// across iterations rather than via this method).
    pub fn next(self) -> Option<WorkflowStage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Is `s -> next` a legal transition under the stage monotonicity rule?
    /// `s = None` represents "no stage yet" (only `Initializing` may follow).
    pub fn is_valid_transition(from: Option<WorkflowStage>, to: WorkflowStage) -> bool {
        match from {
            None => to == WorkflowStage::Initializing,
            Some(s) if s == to => true, // retry
            Some(WorkflowStage::Validating) => {
                // Loop back into the iteration body for the next iteration,
                // or proceed to finalizing once the caller is done looping.
                to == WorkflowStage::Analyzing || to == WorkflowStage::Finalizing
            }
            Some(s) => s.next() == Some(to),
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
