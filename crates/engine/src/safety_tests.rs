// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use evoseal_core::ids::VersionId;
use evoseal_core::metrics::{MetricsRun, MetricsTotals, ResourceMetrics};
use evoseal_storage::{BaselineStore, CheckpointInput, CheckpointStore, CheckpointStoreConfig, FileContent, MetricsStore, RollbackHistoryStore};
use std::collections::BTreeMap;
use std::sync::Arc;

fn run(version: &str, passed: u64, failed: u64, duration_sec: f64) -> MetricsRun {
    MetricsRun::new(
        VersionId::new(version),
        "unit",
        MetricsTotals { tests_run: passed + failed, passed, failed, skipped: 0, errors: 0 },
        ResourceMetrics { duration_sec, memory_mb: 100.0, cpu_percent: 20.0, io_read_mb: 0.0, io_write_mb: 0.0 },
    )
}

fn checkpoint_input(content: &str) -> CheckpointInput {
    let mut changes = BTreeMap::new();
    changes.insert("file.txt".to_string(), FileContent::Inline(content.as_bytes().to_vec()));
    CheckpointInput { changes, ..Default::default() }
}

fn integration(dir: &std::path::Path) -> (SafetyIntegration, Arc<CheckpointStore>, Arc<MetricsStore>) {
    let checkpoints = Arc::new(CheckpointStore::new(CheckpointStoreConfig { checkpoint_directory: dir.join("checkpoints"), ..Default::default() }).unwrap());
    let metrics = Arc::new(MetricsStore::new(dir.join("metrics.json")).unwrap());
    let baselines = Arc::new(BaselineStore::new(dir.join("baselines.json")).unwrap());
    let bus = EventBus::default();
    let regression = Arc::new(RegressionDetector::new(RegressionConfig::default(), metrics.clone(), baselines, bus.clone()));
    let history = Arc::new(RollbackHistoryStore::new(dir.join("rollback_history.json")).unwrap());
    let rollback = Arc::new(RollbackEngine::new(checkpoints.clone(), history, bus.clone(), RollbackEngineConfig { working_directory: dir.join("workspace"), ..Default::default() }));
    (SafetyIntegration::new(checkpoints.clone(), metrics.clone(), regression, rollback, bus), checkpoints, metrics)
}

#[tokio::test]
async fn validate_version_safety_passes_when_nothing_regressed() {
    let dir = tempfile::tempdir().unwrap();
    let (safety, _checkpoints, metrics) = integration(dir.path());
    metrics.append(run("v1", 100, 0, 10.0)).unwrap();
    metrics.append(run("v2", 100, 0, 10.5)).unwrap();

    let assessment = safety.validate_version_safety(0i64, 1i64).await.unwrap();
    assert!(assessment.is_safe);
    assert!(assessment.score > 0.9);
}

#[tokio::test]
async fn validate_version_safety_fails_on_failed_tests() {
    let dir = tempfile::tempdir().unwrap();
    let (safety, _checkpoints, metrics) = integration(dir.path());
    metrics.append(run("v1", 100, 0, 10.0)).unwrap();
    metrics.append(run("v2", 95, 5, 10.0)).unwrap();

    let assessment = safety.validate_version_safety(0i64, 1i64).await.unwrap();
    assert!(assessment.has_failed_tests);
    assert!(!assessment.is_safe);
}

#[tokio::test]
async fn validate_version_safety_errors_on_critical_regression() {
    let dir = tempfile::tempdir().unwrap();
    let (safety, _checkpoints, metrics) = integration(dir.path());
    metrics.append(run("v1", 100, 0, 10.0)).unwrap();
    metrics.append(run("v2", 100, 0, 14.0)).unwrap(); // +40% duration: critical

    let err = safety.validate_version_safety(0i64, 1i64).await.unwrap_err();
    assert!(matches!(err, SafetyError::CriticalRegression { .. }));
}

#[tokio::test]
async fn execute_safe_evolution_step_rolls_back_on_critical_regression() {
    let dir = tempfile::tempdir().unwrap();
    let (safety, checkpoints, metrics) = integration(dir.path());

    let v1 = VersionId::new("v1");
    checkpoints.create_checkpoint(&v1, &checkpoint_input("good"), false).unwrap();
    metrics.append(run("v1", 100, 0, 10.0)).unwrap();

    let v2 = VersionId::new("v2");
    metrics.append(run("v2", 100, 0, 14.0)).unwrap();

    let outcome = safety.execute_safe_evolution_step(&v1, &v2, &checkpoint_input("regressed")).await.unwrap();
    assert!(outcome.rolled_back);
    assert!(outcome.rollback_event.is_some());
}

#[tokio::test]
async fn execute_safe_evolution_step_keeps_safe_version() {
    let dir = tempfile::tempdir().unwrap();
    let (safety, checkpoints, metrics) = integration(dir.path());

    let v1 = VersionId::new("v1");
    checkpoints.create_checkpoint(&v1, &checkpoint_input("good"), false).unwrap();
    metrics.append(run("v1", 100, 0, 10.0)).unwrap();

    let v2 = VersionId::new("v2");
    metrics.append(run("v2", 100, 0, 10.2)).unwrap();

    let outcome = safety.execute_safe_evolution_step(&v1, &v2, &checkpoint_input("improved")).await.unwrap();
    assert!(!outcome.rolled_back);
    assert!(outcome.assessment.is_safe);
}
