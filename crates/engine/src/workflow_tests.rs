// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::FakeRepositoryCollaborator;
use super::*;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Scripted `EvolutionStages`: runs for `fail_evaluate_times` failures on
/// the `evaluate` stage before succeeding, and stops the iteration loop
/// after `continue_for` validations.
struct ScriptedStages {
    fail_evaluate_times: AtomicU32,
    continue_for: u32,
}

#[async_trait::async_trait]
impl EvolutionStages for ScriptedStages {
    async fn analyze(&self, _iteration: u32, _branch: &str) -> Result<Value, StageError> {
        Ok(json!({"analysis": true}))
    }

    async fn generate(&self, _iteration: u32, _branch: &str, _analysis: &Value) -> Result<Value, StageError> {
        Ok(json!({"candidate": "c1"}))
    }

    async fn adapt(&self, _iteration: u32, _branch: &str, _generated: &Value) -> Result<Value, StageError> {
        Ok(json!({"adapted": true}))
    }

    async fn evaluate(&self, _iteration: u32, _branch: &str, _adapted: &Value) -> Result<Value, StageError> {
        if self.fail_evaluate_times.load(Ordering::SeqCst) > 0 {
            self.fail_evaluate_times.fetch_sub(1, Ordering::SeqCst);
            return Err(StageError::Transport("evaluation service unavailable".to_string()));
        }
        Ok(json!({"score": 0.9}))
    }

    async fn validate(&self, iteration: u32, _branch: &str, _evaluation: &Value) -> Result<ValidationOutcome, StageError> {
        Ok(ValidationOutcome { passed: true, should_continue: iteration + 1 < self.continue_for, data: json!({"iteration": iteration}) })
    }
}

fn coordinator(dir: &std::path::Path, fail_evaluate_times: u32, continue_for: u32) -> WorkflowCoordinator<FakeRepositoryCollaborator, ScriptedStages> {
    WorkflowCoordinator::new(
        FakeRepositoryCollaborator::default(),
        ScriptedStages { fail_evaluate_times: AtomicU32::new(fail_evaluate_times), continue_for },
        EventBus::default(),
        WorkflowConfig { state_path: dir.join("workflow_state.json"), ..Default::default() },
    )
}

#[tokio::test]
async fn run_workflow_completes_after_requested_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(dir.path(), 0, 3);

    coordinator.run_workflow("https://example.invalid/repo.git", 3, false).await.unwrap();

    let state = coordinator.state();
    assert_eq!(state.state, WorkflowState::Completed);
    assert_eq!(state.stage, Some(WorkflowStage::Finalizing));
    assert_eq!(state.stage_results.len(), 3);
}

#[tokio::test]
async fn run_workflow_stops_early_when_validation_says_so() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(dir.path(), 0, 1); // should_continue=false after iteration 0

    coordinator.run_workflow("https://example.invalid/repo.git", 5, false).await.unwrap();

    let state = coordinator.state();
    assert_eq!(state.state, WorkflowState::Completed);
    assert_eq!(state.stage_results.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn run_workflow_retries_transient_stage_failure() {
    let dir = tempfile::tempdir().unwrap();
    // Fails twice, succeeds on the third attempt — within max_stage_attempts (3).
    let coordinator = coordinator(dir.path(), 2, 1);

    coordinator.run_workflow("https://example.invalid/repo.git", 1, false).await.unwrap();

    let state = coordinator.state();
    assert_eq!(state.state, WorkflowState::Completed);
}

#[tokio::test]
async fn run_workflow_exhausts_retries_and_marks_failed() {
    let dir = tempfile::tempdir().unwrap();
    // Fails every attempt, more than max_stage_attempts (3) can absorb.
    let coordinator = coordinator(dir.path(), 10, 1);

    let err = coordinator.run_workflow("https://example.invalid/repo.git", 1, false).await.unwrap_err();
    assert!(matches!(err, WorkflowError::StageExhausted { stage: WorkflowStage::Evaluating, .. }));

    let state = coordinator.state();
    assert_eq!(state.state, WorkflowState::Failed);
}

#[tokio::test]
async fn request_pause_parks_the_coordinator_until_resume() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = Arc::new(coordinator(dir.path(), 0, 3));
    coordinator.request_pause();

    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_workflow("https://example.invalid/repo.git", 3, false).await })
    };

    // Give the coordinator a chance to reach the pause checkpoint and persist.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(coordinator.is_paused());
    assert_eq!(coordinator.state().state, WorkflowState::Paused);

    coordinator.resume();
    run.await.unwrap().unwrap();

    assert_eq!(coordinator.state().state, WorkflowState::Completed);
}

#[tokio::test]
async fn run_workflow_persists_state_for_resume() {
    let dir = tempfile::tempdir().unwrap();
    {
        let coordinator = coordinator(dir.path(), 0, 1);
        coordinator.run_workflow("https://example.invalid/repo.git", 1, false).await.unwrap();
    }

    // A fresh coordinator resuming from the same state path sees the
    // already-completed run without replaying any iterations.
    let resumed = coordinator(dir.path(), 0, 1);
    resumed.run_workflow("https://example.invalid/repo.git", 1, true).await.unwrap();
    assert_eq!(resumed.state().state, WorkflowState::Completed);
}
