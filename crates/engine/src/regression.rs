// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Regression detector: per-metric, direction-aware threshold comparison
//! between two metrics runs, severity classification, and named baselines.
//! `change_pct` coming out of `evoseal_storage`'s
//! `MetricsStore::compare_metrics` is always percent-scale (e.g. `7.4`);
//! this module normalizes to a fraction before applying any threshold.

use std::collections::HashMap;
use std::sync::Arc;

use evoseal_core::ids::{BaselineId, VersionId};
use evoseal_core::metrics::Baseline;
use evoseal_core::{Event, EventBus, EventKind};
use evoseal_storage::{BaselineStore, MetricDelta, MetricsId, MetricsStore, Result as StorageResult};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-metric regression/critical thresholds, expressed as signed fractions
/// (e.g. `-0.05` for a quality metric's 5% regression threshold).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub regression: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCategory {
    /// Higher is better (success rate, accuracy, ...): a regression is a
    /// *decrease* past the (negative) threshold.
    Quality,
    /// Lower is better (duration, memory, cpu, ...): a regression is an
    /// *increase* past the threshold.
    Performance,
    /// Lower is better, same direction as `Performance`, kept distinct
    /// because it gets its own threshold pair.
    Reliability,
    /// No direction convention: a regression is any change whose magnitude
    /// exceeds the threshold.
    Custom,
}

/// Regression detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub regression_threshold: f64,
    pub metric_thresholds: HashMap<String, MetricThreshold>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        let mut t = HashMap::new();
        // Performance (lower-better): regression +10%.
        // durationSec/executionTime critical 25%, memoryMB/cpuPercent critical 30%.
        for name in ["duration_sec", "execution_time"] {
            t.insert(name.to_string(), MetricThreshold { regression: 0.10, critical: 0.25 });
        }
        for name in ["memory_mb", "cpu_percent"] {
            t.insert(name.to_string(), MetricThreshold { regression: 0.10, critical: 0.30 });
        }
        // Quality (higher-better): regression/critical expressed negative.
        for name in ["success_rate", "accuracy", "precision", "recall", "f1_score", "pass_rate"] {
            t.insert(name.to_string(), MetricThreshold { regression: -0.05, critical: -0.10 });
        }
        t.insert("correctness".to_string(), MetricThreshold { regression: -0.01, critical: -0.05 });
        // Reliability (lower-better): regression +5%, critical +10%.
        for name in ["error_rate", "failure_rate"] {
            t.insert(name.to_string(), MetricThreshold { regression: 0.05, critical: 0.10 });
        }
        Self { regression_threshold: 0.05, metric_thresholds: t }
    }
}

impl RegressionConfig {
    fn category(&self, metric: &str) -> MetricCategory {
        match metric {
            "success_rate" | "accuracy" | "precision" | "recall" | "f1_score" | "pass_rate" | "correctness" => MetricCategory::Quality,
            "duration_sec" | "memory_mb" | "cpu_percent" | "execution_time" => MetricCategory::Performance,
            "error_rate" | "failure_rate" => MetricCategory::Reliability,
            _ => MetricCategory::Custom,
        }
    }

    fn threshold(&self, metric: &str, category: MetricCategory) -> MetricThreshold {
        self.metric_thresholds.get(metric).copied().unwrap_or_else(|| match category {
            MetricCategory::Quality => MetricThreshold { regression: -self.regression_threshold, critical: -self.regression_threshold * 2.0 },
            MetricCategory::Performance | MetricCategory::Reliability => {
                MetricThreshold { regression: self.regression_threshold, critical: self.regression_threshold * 2.0 }
            }
            MetricCategory::Custom => MetricThreshold { regression: self.regression_threshold, critical: self.regression_threshold * 2.0 },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        })
    }
}

/// One metric's regression verdict.
#[derive(Debug, Clone)]
pub struct RegressionDetail {
    pub metric: String,
    pub category: MetricCategory,
    /// Normalized change, as a fraction (not percent).
    pub change: f64,
    pub is_regression: bool,
    pub severity: Option<Severity>,
}

/// Normalize a `change_pct` value that may be percent-scale (`7.4`) or
/// already a fraction (`0.074`) to a fraction, /
/// §9 Open Question #1.
fn normalize_to_fraction(change_pct: f64) -> f64 {
    if change_pct.abs() > 1.0 {
        change_pct / 100.0
    } else {
        change_pct
    }
}

fn classify(change: f64, category: MetricCategory, threshold: MetricThreshold) -> (bool, Option<Severity>) {
    let is_regression = match category {
        MetricCategory::Quality => change < threshold.regression,
        MetricCategory::Performance | MetricCategory::Reliability => change > threshold.regression.abs(),
        MetricCategory::Custom => change.abs() > threshold.regression.abs(),
    };
    if !is_regression {
        return (false, None);
    }
    let r = change.abs();
    let reg = threshold.regression.abs();
    let crit = threshold.critical.abs();
    let severity = if r >= crit {
        Severity::Critical
    } else if r >= 2.0 * reg {
        Severity::High
    } else if r >= 1.5 * reg {
        Severity::Medium
    } else {
        Severity::Low
    };
    (true, Some(severity))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    RollbackRequired,
    ReviewRequired,
    CautionAdvised,
    Monitor,
    NoAction,
}

#[derive(Debug, Clone)]
pub struct RegressionSummary {
    pub total_regressions: usize,
    pub severity_counts: HashMap<Severity, usize>,
    pub critical_regressions: Vec<String>,
    pub affected_metrics: Vec<String>,
    pub recommendation: Recommendation,
}

fn summarize(details: &[RegressionDetail]) -> RegressionSummary {
    let regressions: Vec<&RegressionDetail> = details.iter().filter(|d| d.is_regression).collect();
    let mut severity_counts: HashMap<Severity, usize> = HashMap::new();
    let mut critical_regressions = Vec::new();
    for d in &regressions {
        if let Some(sev) = d.severity {
            *severity_counts.entry(sev).or_insert(0) += 1;
            if sev == Severity::Critical {
                critical_regressions.push(d.metric.clone());
            }
        }
    }

    let recommendation = if !critical_regressions.is_empty() {
        Recommendation::RollbackRequired
    } else if severity_counts.get(&Severity::High).copied().unwrap_or(0) > 0 {
        Recommendation::ReviewRequired
    } else if severity_counts.get(&Severity::Medium).copied().unwrap_or(0) >= 3 {
        Recommendation::CautionAdvised
    } else if regressions.is_empty() {
        Recommendation::NoAction
    } else {
        Recommendation::Monitor
    };

    RegressionSummary {
        total_regressions: regressions.len(),
        severity_counts,
        critical_regressions,
        affected_metrics: regressions.iter().map(|d| d.metric.clone()).collect(),
        recommendation,
    }
}

type AlertCallback = Arc<dyn Fn(&RegressionSummary) + Send + Sync>;

/// Regression detector: wraps `evoseal_storage::MetricsStore` comparisons
/// with the direction-aware threshold table and baseline bookkeeping
///.
pub struct RegressionDetector {
    config: RegressionConfig,
    metrics: Arc<MetricsStore>,
    baselines: Arc<BaselineStore>,
    event_bus: EventBus,
    alert_callbacks: Mutex<Vec<AlertCallback>>,
}

impl RegressionDetector {
    pub fn new(config: RegressionConfig, metrics: Arc<MetricsStore>, baselines: Arc<BaselineStore>, event_bus: EventBus) -> Self {
        Self { config, metrics, baselines, event_bus, alert_callbacks: Mutex::new(Vec::new()) }
    }

    fn details_from_deltas(&self, deltas: &IndexMap<String, MetricDelta>) -> Vec<RegressionDetail> {
        deltas
            .iter()
            .map(|(metric, delta)| {
                let category = self.config.category(metric);
                let threshold = self.config.threshold(metric, category);
                let change = normalize_to_fraction(delta.change_pct);
                let (is_regression, severity) = classify(change, category, threshold);
                RegressionDetail { metric: metric.clone(), category, change, is_regression, severity }
            })
            .collect()
    }

    /// Compare two metrics runs and classify every metric's delta (spec
    /// §4.6 `detectRegression`). Returns `(has_regression, details)`.
    pub fn detect_regression(&self, old_id: impl Into<MetricsId>, new_id: impl Into<MetricsId>) -> StorageResult<(bool, Vec<RegressionDetail>)> {
        let deltas = self.metrics.compare_metrics(old_id, new_id, None)?;
        let details = self.details_from_deltas(&deltas);
        Ok((details.iter().any(|d| d.is_regression), details))
    }

    pub fn summarize(&self, details: &[RegressionDetail]) -> RegressionSummary {
        summarize(details)
    }

    pub async fn establish_baseline(&self, version_id: impl Into<MetricsId>, name: impl Into<String>) -> StorageResult<Baseline> {
        let run = self
            .metrics
            .get_metrics_by_id(version_id.into(), None)
            .ok_or_else(|| evoseal_storage::StorageError::MetricsNotFound("baseline source run".to_string()))?;
        let metrics_value = serde_json::to_value(&run).unwrap_or(Value::Null);
        let metrics_map = metrics_value.as_object().cloned().unwrap_or_default();

        let name = BaselineId::new(name.into());
        let baseline = self.baselines.establish(name, run.version_id.clone(), metrics_map)?;
        self.event_bus
            .publish(Event::new(EventKind::BaselineEstablished, "regression_detector").insert("name", baseline.name.as_str()))
            .await;
        Ok(baseline)
    }

    pub fn list_baselines(&self) -> Vec<Baseline> {
        self.baselines.list()
    }

    /// Compare a version's latest metrics run against a named baseline
    ///.
    pub fn compare_against_baseline(&self, new_id: impl Into<MetricsId>, name: &str) -> StorageResult<(bool, Vec<RegressionDetail>)> {
        let baseline = self
            .baselines
            .get(name)
            .ok_or_else(|| evoseal_storage::StorageError::BaselineNotFound(name.to_string()))?;
        let new_run = self
            .metrics
            .get_metrics_by_id(new_id.into(), None)
            .ok_or_else(|| evoseal_storage::StorageError::MetricsNotFound("comparison run".to_string()))?;

        let baseline_success_rate = baseline.metrics.get("success_rate").and_then(Value::as_f64).unwrap_or(0.0);
        let baseline_duration = baseline
            .metrics
            .get("resources")
            .and_then(|r| r.get("duration_sec"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let mut deltas = IndexMap::new();
        deltas.insert(
            "success_rate".to_string(),
            delta(baseline_success_rate * 100.0, new_run.success_rate * 100.0),
        );
        deltas.insert("duration_sec".to_string(), delta(baseline_duration, new_run.resources.duration_sec));

        let details = self.details_from_deltas(&deltas);
        Ok((details.iter().any(|d| d.is_regression), details))
    }

    pub fn register_alert_callback(&self, callback: AlertCallback) {
        self.alert_callbacks.lock().push(callback);
    }

    /// Notify registered callbacks and publish a `REGRESSION_ALERT` event.
    /// Called by the safety layer once a regression has been detected.
    pub async fn notify_alert(&self, summary: &RegressionSummary) {
        for callback in self.alert_callbacks.lock().iter() {
            callback(summary);
        }
        self.event_bus
            .publish(
                Event::new(EventKind::RegressionAlert, "regression_detector")
                    .insert("totalRegressions", summary.total_regressions as u64)
                    .insert("recommendation", format!("{:?}", summary.recommendation)),
            )
            .await;
    }
}

fn delta(baseline: f64, current: f64) -> MetricDelta {
    let difference = current - baseline;
    let change_pct = if baseline != 0.0 { difference / baseline * 100.0 } else { 0.0 };
    MetricDelta {
        baseline,
        current,
        difference,
        change_pct,
        direction: if difference >= 0.0 { evoseal_storage::Direction::Increase } else { evoseal_storage::Direction::Decrease },
    }
}

#[cfg(test)]
#[path = "regression_tests.rs"]
mod tests;
