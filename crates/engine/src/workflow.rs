// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evolution pipeline / workflow coordinator: drives the
//! `initializing -> (analyzing -> generating -> adapting -> evaluating ->
//! validating)* -> finalizing` stage sequence, retrying a failed stage with
//! backoff before giving up and handing control to the rollback engine.
//! Git branch/commit/merge operations are abstracted behind
//! `RepositoryCollaborator`; the five per-stage callbacks are abstracted behind
//! `EvolutionStages` so this module stays agnostic to what "generate a
//! candidate" or "evaluate it" actually means for a given embedder.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evoseal_core::{Event, EventBus, EventKind, WorkflowStage, WorkflowState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Notify;

use crate::error::{RepoError, StageError, WorkflowError};

/// Base retry delay; actual delay is `min(RETRY_BASE * 2^attempt, 300s)`
///.
const RETRY_BASE: Duration = Duration::from_secs(2);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

fn backoff_delay(attempt: u32) -> Duration {
    let scaled = RETRY_BASE.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    scaled.min(MAX_RETRY_DELAY)
}

/// Git branch lifecycle the workflow coordinator drives around each
/// iteration's changes.
#[async_trait]
pub trait RepositoryCollaborator: Send + Sync {
    async fn prepare_branch(&self, base: &str) -> Result<String, RepoError>;
    async fn commit(&self, branch: &str, message: &str) -> Result<(), RepoError>;
    async fn merge(&self, branch: &str, into: &str) -> Result<(), RepoError>;
    async fn abort_merge(&self, branch: &str) -> Result<(), RepoError>;
    /// Called once a stage exhausts its retry budget:
    /// branches the failed attempt off to the side so `main` stays clean.
    async fn create_recovery_branch(&self, from: &str) -> Result<String, RepoError>;
}

/// Outcome of the `validating` stage: whether the iteration loop should
/// keep going.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub should_continue: bool,
    pub data: Value,
}

/// The five per-iteration stage callbacks. An
/// implementation owns whatever it means to analyze/generate/adapt/
/// evaluate/validate a candidate for a given embedder; this trait only
/// fixes the boundary the coordinator drives.
#[async_trait]
pub trait EvolutionStages: Send + Sync {
    async fn analyze(&self, iteration: u32, branch: &str) -> Result<Value, StageError>;
    async fn generate(&self, iteration: u32, branch: &str, analysis: &Value) -> Result<Value, StageError>;
    async fn adapt(&self, iteration: u32, branch: &str, generated: &Value) -> Result<Value, StageError>;
    async fn evaluate(&self, iteration: u32, branch: &str, adapted: &Value) -> Result<Value, StageError>;
    async fn validate(&self, iteration: u32, branch: &str, evaluation: &Value) -> Result<ValidationOutcome, StageError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_stage_attempts: u32,
    pub request_timeout: Duration,
    pub state_path: PathBuf,
    pub base_branch: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_stage_attempts: 3,
            request_timeout: Duration::from_secs(300),
            state_path: PathBuf::from("./.evoseal/workflow_state.json"),
            base_branch: "main".to_string(),
        }
    }
}

/// The persisted shape of `workflowState.json`. Written with a write-temp-then-rename so a
/// crash mid-write can never leave the file truncated or invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStateFile {
    pub state: WorkflowState,
    pub stage: Option<WorkflowStage>,
    pub iteration: u32,
    pub branch: Option<String>,
    pub stage_results: serde_json::Map<String, Value>,
    pub retry_count: u32,
}

impl Default for WorkflowStateFile {
    fn default() -> Self {
        Self {
            state: WorkflowState::NotStarted,
            stage: None,
            iteration: 0,
            branch: None,
            stage_results: Default::default(),
            retry_count: 0,
        }
    }
}

fn atomic_write_json<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, &bytes)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

/// Drives the evolution pipeline's stage state machine over a
/// `RepositoryCollaborator` and `EvolutionStages` pair.
pub struct WorkflowCoordinator<R: RepositoryCollaborator, S: EvolutionStages> {
    repo: R,
    stages: S,
    event_bus: EventBus,
    config: WorkflowConfig,
    state: Mutex<WorkflowStateFile>,
    pause_requested: Arc<AtomicBool>,
    resume_notify: Arc<Notify>,
}

impl<R: RepositoryCollaborator, S: EvolutionStages> WorkflowCoordinator<R, S> {
    pub fn new(repo: R, stages: S, event_bus: EventBus, config: WorkflowConfig) -> Self {
        Self {
            repo,
            stages,
            event_bus,
            config,
            state: Mutex::new(WorkflowStateFile::default()),
            pause_requested: Arc::new(AtomicBool::new(false)),
            resume_notify: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> WorkflowStateFile {
        self.state.lock().clone()
    }

    /// Request that the coordinator pause at the next stage-attempt boundary
    ///. In-flight adapter calls are allowed to
    /// finish; the flag is only observed between attempts.
    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    /// Clear the pause request and wake a coordinator parked in
    /// `run_with_retry` awaiting resume.
    pub fn resume(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().state == WorkflowState::Paused
    }

    fn persist(&self) -> Result<(), WorkflowError> {
        let snapshot = self.state.lock().clone();
        atomic_write_json(&self.config.state_path, &snapshot)
    }

    fn load(&self) -> Result<(), WorkflowError> {
        if !self.config.state_path.exists() {
            return Ok(());
        }
        let bytes = std::fs::read(&self.config.state_path)?;
        let loaded: WorkflowStateFile = serde_json::from_slice(&bytes)?;
        *self.state.lock() = loaded;
        Ok(())
    }

    /// Validate and apply a stage transition, publishing `StageStarted`.
    fn transition_stage(&self, to: WorkflowStage) -> Result<(), WorkflowError> {
        let mut state = self.state.lock();
        if !WorkflowStage::is_valid_transition(state.stage, to) {
            return Err(WorkflowError::InvalidTransition { from: state.stage, to });
        }
        state.stage = Some(to);
        Ok(())
    }

    async fn publish_stage(&self, kind: EventKind, stage: WorkflowStage) {
        self.event_bus.publish(Event::new(kind, "workflow_coordinator").insert("stage", stage.to_string())).await;
    }

    /// If a pause was requested, set state to `paused`, persist, and block
    /// until `resume()` is called. A no-op when no pause is pending.
    async fn wait_while_paused(&self) -> Result<(), WorkflowError> {
        if !self.pause_requested.load(Ordering::SeqCst) {
            return Ok(());
        }

        {
            let mut state = self.state.lock();
            state.state = WorkflowState::Paused;
        }
        self.persist()?;

        // Register interest before the second flag check so a `resume()`
        // racing in between the first check and the `.await` is never missed.
        loop {
            if !self.pause_requested.load(Ordering::SeqCst) {
                break;
            }
            let notified = self.resume_notify.notified();
            if !self.pause_requested.load(Ordering::SeqCst) {
                break;
            }
            notified.await;
        }

        {
            let mut state = self.state.lock();
            state.state = WorkflowState::Running;
        }
        self.persist()?;
        Ok(())
    }

    /// Run one stage callback with retry + backoff:
    /// a merge conflict aborts the merge and retries immediately; a
    /// transport/timeout failure backs off exponentially; a fatal failure
    /// and attempt exhaustion both branch off to a recovery branch and mark
    /// the workflow failed.
    async fn run_with_retry<F, Fut, T>(&self, stage: WorkflowStage, branch: &str, f: F) -> Result<T, WorkflowError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StageError>>,
    {
        self.transition_stage(stage)?;
        self.publish_stage(EventKind::StageStarted, stage).await;

        let mut attempt = 0u32;
        loop {
            self.wait_while_paused().await?;

            match f().await {
                Ok(value) => {
                    self.publish_stage(EventKind::StageCompleted, stage).await;
                    return Ok(value);
                }
                Err(err) => {
                    if let StageError::Repo(RepoError::Conflict { .. }) = &err {
                        let _ = self.repo.abort_merge(branch).await;
                    }

                    attempt += 1;
                    if attempt >= self.config.max_stage_attempts || !err.is_retriable() {
                        self.publish_stage(EventKind::StageFailed, stage).await;
                        let _ = self.repo.create_recovery_branch(branch).await;
                        self.state.lock().state = WorkflowState::Failed;
                        self.persist()?;
                        return Err(WorkflowError::StageExhausted { stage, source: err });
                    }

                    self.state.lock().retry_count = attempt;
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    /// Run `iterations` passes of the analyze/generate/adapt/evaluate/
    /// validate loop over `repository_url`, stopping early if a
    /// `validating` stage reports `should_continue=false`. `resume` reloads persisted state before continuing
    /// rather than starting a fresh branch.
    pub async fn run_workflow(&self, repository_url: &str, iterations: u32, resume: bool) -> Result<(), WorkflowError> {
        if resume {
            self.load()?;
        }

        {
            let mut state = self.state.lock();
            state.state = WorkflowState::Running;
        }
        self.event_bus.publish(Event::new(EventKind::WorkflowStarted, "workflow_coordinator").insert("repository", repository_url)).await;

        let branch = if let Some(existing) = self.state.lock().branch.clone() {
            existing
        } else {
            self.transition_stage(WorkflowStage::Initializing)?;
            let branch = self.repo.prepare_branch(&self.config.base_branch).await.map_err(StageError::from)?;
            self.state.lock().branch = Some(branch.clone());
            self.persist()?;
            branch
        };

        let start_iteration = self.state.lock().iteration;
        for iteration in start_iteration..iterations {
            self.state.lock().iteration = iteration;

            let analysis = self.run_with_retry(WorkflowStage::Analyzing, &branch, || self.stages.analyze(iteration, &branch)).await?;
            let generated = self.run_with_retry(WorkflowStage::Generating, &branch, || self.stages.generate(iteration, &branch, &analysis)).await?;
            let adapted = self.run_with_retry(WorkflowStage::Adapting, &branch, || self.stages.adapt(iteration, &branch, &generated)).await?;
            let evaluation = self.run_with_retry(WorkflowStage::Evaluating, &branch, || self.stages.evaluate(iteration, &branch, &adapted)).await?;
            let validation = self.run_with_retry(WorkflowStage::Validating, &branch, || self.stages.validate(iteration, &branch, &evaluation)).await?;

            self.repo.commit(&branch, &format!("evolution iteration {iteration}")).await.map_err(StageError::from)?;

            {
                let mut state = self.state.lock();
                state.stage_results.insert(format!("iteration_{iteration}"), validation.data.clone());
            }
            self.persist()?;

            if !validation.should_continue {
                break;
            }
        }

        self.transition_stage(WorkflowStage::Finalizing)?;
        self.publish_stage(EventKind::StageStarted, WorkflowStage::Finalizing).await;
        self.repo.merge(&branch, &self.config.base_branch).await.map_err(StageError::from)?;
        self.publish_stage(EventKind::StageCompleted, WorkflowStage::Finalizing).await;

        {
            let mut state = self.state.lock();
            state.state = WorkflowState::Completed;
        }
        self.persist()?;
        self.event_bus.publish(Event::new(EventKind::WorkflowCompleted, "workflow_coordinator").insert("repository", repository_url)).await;

        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    /// In-memory `RepositoryCollaborator` double for tests.
    /// `fail_prepare_times` lets a test force the first N `prepare_branch`
    /// calls to fail, exercising the coordinator's retry path.
    #[derive(Default)]
    pub struct FakeRepositoryCollaborator {
        branch_counter: AtomicU64,
        pub fail_prepare_times: AtomicU64,
    }

    #[async_trait]
    impl RepositoryCollaborator for FakeRepositoryCollaborator {
        async fn prepare_branch(&self, base: &str) -> Result<String, RepoError> {
            if self.fail_prepare_times.load(AtomicOrdering::SeqCst) > 0 {
                self.fail_prepare_times.fetch_sub(1, AtomicOrdering::SeqCst);
                return Err(RepoError::Command { command: "git checkout -b".to_string(), status: Some(1), stderr: "simulated failure".to_string() });
            }
            let n = self.branch_counter.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(format!("evolve/{base}-{n}"))
        }

        async fn commit(&self, _branch: &str, _message: &str) -> Result<(), RepoError> {
            Ok(())
        }

        async fn merge(&self, _branch: &str, _into: &str) -> Result<(), RepoError> {
            Ok(())
        }

        async fn abort_merge(&self, _branch: &str) -> Result<(), RepoError> {
            Ok(())
        }

        async fn create_recovery_branch(&self, from: &str) -> Result<String, RepoError> {
            Ok(format!("recovery/{from}"))
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
