// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! evoseal-engine: the pieces that turn the core data model and the
//! component adapters into a running evolution pipeline — the integration
//! orchestrator, the regression detector, the rollback engine, the safety
//! layer gluing the two together, and the workflow coordinator driving the
//! whole stage sequence.

pub mod error;
pub mod orchestrator;
pub mod regression;
pub mod rollback;
pub mod safety;
pub mod workflow;

pub use error::{RepoError, RollbackError, SafetyError, StageError, WorkflowError};
pub use orchestrator::{EvolutionWorkflowConfig, EvolutionWorkflowResult, Orchestrator, StageOutcome};
pub use regression::{
    MetricCategory, MetricThreshold, Recommendation, RegressionConfig, RegressionDetail, RegressionDetector, RegressionSummary, Severity,
};
pub use rollback::{
    AutoRollbackTrigger, CascadingRollbackOutcome, RecoveryOutcome, RecoveryStrategy, RollbackEngine, RollbackEngineConfig,
};
pub use safety::{SafeStepOutcome, SafetyAssessment, SafetyIntegration};
pub use workflow::{EvolutionStages, RepositoryCollaborator, ValidationOutcome, WorkflowConfig, WorkflowCoordinator, WorkflowStateFile};

#[cfg(any(test, feature = "test-support"))]
pub use workflow::fake::FakeRepositoryCollaborator;
