// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics data model: one append-only row per test run,
//! plus named baselines used by the regression detector.

use crate::ids::{BaselineId, VersionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pass/fail/skip/error counts for one test run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsTotals {
    pub tests_run: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl MetricsTotals {
    /// `passed / tests_run`, as a fraction in `[0, 1]`. Zero when no tests ran.
    pub fn success_rate(&self) -> f64 {
        if self.tests_run == 0 {
            0.0
        } else {
            self.passed as f64 / self.tests_run as f64
        }
    }
}

/// Resource usage recorded alongside a test run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub duration_sec: f64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub io_read_mb: f64,
    pub io_write_mb: f64,
}

/// One append-only row of the metrics store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRun {
    pub version_id: VersionId,
    pub test_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub totals: MetricsTotals,
    pub success_rate: f64,
    pub resources: ResourceMetrics,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl MetricsRun {
    pub fn new(version_id: VersionId, test_type: impl Into<String>, totals: MetricsTotals, resources: ResourceMetrics) -> Self {
        let success_rate = totals.success_rate();
        Self {
            version_id,
            test_type: test_type.into(),
            timestamp: chrono::Utc::now(),
            totals,
            success_rate,
            resources,
            metadata: Default::default(),
        }
    }
}

/// A named snapshot of a version's metrics, used by the regression detector
/// as a stable comparison point across many later versions. `name` is the
/// baseline's identifier and storage key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub name: BaselineId,
    pub version_id: VersionId,
    pub metrics: serde_json::Map<String, Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
