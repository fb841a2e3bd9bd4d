// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safety integration: glues the checkpoint store, the regression
//! detector, and the rollback engine into the single
//! `execute_safe_evolution_step` call the workflow coordinator drives per
//! iteration — checkpoint before, run the step, score the result, roll
//! back automatically when the score or a critical regression says the
//! step made things worse.

use std::sync::Arc;

use evoseal_core::ids::VersionId;
use evoseal_core::{Event, EventBus, EventKind, RollbackEvent};
use evoseal_storage::{CheckpointInput, CheckpointStore, MetricsId, MetricsStore};
use serde::{Deserialize, Serialize};

use crate::error::SafetyError;
use crate::regression::{RegressionDetail, RegressionDetector, Severity};
use crate::rollback::RollbackEngine;

/// Severity-weighted penalties and the pass/fail cutoff for
/// `validate_version_safety`'s composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub critical_penalty: f64,
    pub high_penalty: f64,
    pub medium_penalty: f64,
    pub low_penalty: f64,
    pub failed_test_penalty: f64,
    pub safe_threshold: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            critical_penalty: 0.5,
            high_penalty: 0.25,
            medium_penalty: 0.1,
            low_penalty: 0.03,
            failed_test_penalty: 0.3,
            safe_threshold: 0.6,
        }
    }
}

impl SafetyConfig {
    fn penalty(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical_penalty,
            Severity::High => self.high_penalty,
            Severity::Medium => self.medium_penalty,
            Severity::Low => self.low_penalty,
        }
    }
}

/// Result of `validate_version_safety`: a composite
/// score plus the regression details it was derived from.
#[derive(Debug, Clone)]
pub struct SafetyAssessment {
    pub score: f64,
    pub is_safe: bool,
    pub has_failed_tests: bool,
    pub regressions: Vec<RegressionDetail>,
}

/// Outcome of `execute_safe_evolution_step`: whether the
/// step's result was kept or rolled back.
#[derive(Debug, Clone)]
pub struct SafeStepOutcome {
    pub assessment: SafetyAssessment,
    pub rolled_back: bool,
    pub rollback_event: Option<RollbackEvent>,
}

pub struct SafetyIntegration {
    checkpoints: Arc<CheckpointStore>,
    metrics: Arc<MetricsStore>,
    regression: Arc<RegressionDetector>,
    rollback: Arc<RollbackEngine>,
    event_bus: EventBus,
}

impl SafetyIntegration {
    pub fn new(checkpoints: Arc<CheckpointStore>, metrics: Arc<MetricsStore>, regression: Arc<RegressionDetector>, rollback: Arc<RollbackEngine>, event_bus: EventBus) -> Self {
        Self { checkpoints, metrics, regression, rollback, event_bus }
    }

    /// Create a checkpoint ahead of a potentially unsafe operation.
    pub fn create_safety_checkpoint(&self, version_id: &VersionId, input: &CheckpointInput, capture_system_state: bool) -> Result<std::path::PathBuf, SafetyError> {
        Ok(self.checkpoints.create_checkpoint(version_id, input, capture_system_state)?)
    }

    /// Score a version's metrics run against its predecessor: `1.0` minus severity-weighted penalties for every detected
    /// regression, minus a flat penalty if the new run had any failed test.
    /// Safe requires the score to clear `0.6`, no critical regression, and
    /// no failed test. A critical regression short-circuits as an error so
    /// callers can react before even looking at the composite score.
    pub async fn validate_version_safety<O, N>(&self, old_id: O, new_id: N) -> Result<SafetyAssessment, SafetyError>
    where
        O: Into<MetricsId>,
        N: Into<MetricsId> + Clone,
    {
        let has_failed_tests = self
            .metrics
            .get_metrics_by_id(new_id.clone().into(), None)
            .map(|r| r.totals.failed > 0)
            .unwrap_or(false);

        let (has_regression, regressions) = self.regression.detect_regression(old_id, new_id)?;

        let critical = regressions.iter().find(|d| d.is_regression && d.severity == Some(Severity::Critical));
        if let Some(critical) = critical {
            let summary = self.regression.summarize(&regressions);
            self.regression.notify_alert(&summary).await;
            return Err(SafetyError::CriticalRegression { metric: critical.metric.clone(), change_pct: critical.change * 100.0 });
        }

        let mut score = 1.0;
        for detail in regressions.iter().filter(|d| d.is_regression) {
            if let Some(severity) = detail.severity {
                score -= penalty(severity);
            }
        }
        if has_failed_tests {
            score -= FAILED_TEST_PENALTY;
        }
        score = score.max(0.0);

        let _ = has_regression; // no critical regression at this point; severity penalties already folded into `score`.
        let is_safe = score >= SAFE_THRESHOLD && !has_failed_tests;

        Ok(SafetyAssessment { score, is_safe, has_failed_tests, regressions })
    }

    /// Checkpoint `version_id`, evaluate its safety against
    /// `parent_version`'s metrics, and roll back to `parent_version` if the
    /// assessment says the step regressed.
    pub async fn execute_safe_evolution_step(&self, parent_version: &VersionId, version_id: &VersionId, input: &CheckpointInput) -> Result<SafeStepOutcome, SafetyError> {
        self.create_safety_checkpoint(version_id, input, true)?;

        let assessment = match self.validate_version_safety(parent_version.as_str(), version_id.as_str()).await {
            Ok(assessment) => assessment,
            Err(SafetyError::CriticalRegression { metric, .. }) => {
                let event = self.rollback.rollback_to_version(parent_version, format!("critical regression in {metric}")).await?;
                self.event_bus
                    .publish(Event::new(EventKind::StateChange, "safety_integration").insert("versionId", version_id.as_str()).insert("isSafe", false))
                    .await;
                return Ok(SafeStepOutcome {
                    assessment: SafetyAssessment { score: 0.0, is_safe: false, has_failed_tests: false, regressions: Vec::new() },
                    rolled_back: true,
                    rollback_event: Some(event),
                });
            }
            Err(other) => return Err(other),
        };

        if assessment.is_safe {
            return Ok(SafeStepOutcome { assessment, rolled_back: false, rollback_event: None });
        }

        let event = self.rollback.rollback_to_version(parent_version, "evolution step failed safety validation").await?;
        self.event_bus
            .publish(Event::new(EventKind::StateChange, "safety_integration").insert("versionId", version_id.as_str()).insert("isSafe", false))
            .await;
        Ok(SafeStepOutcome { assessment, rolled_back: true, rollback_event: Some(event) })
    }
}

#[cfg(test)]
#[path = "safety_tests.rs"]
mod tests;
