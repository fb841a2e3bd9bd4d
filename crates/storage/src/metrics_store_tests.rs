// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use evoseal_core::ids::VersionId;
use evoseal_core::metrics::{MetricsRun, MetricsTotals, ResourceMetrics};

fn run(version: &str, passed: u64, total: u64, duration_sec: f64) -> MetricsRun {
    let totals = MetricsTotals {
        tests_run: total,
        passed,
        failed: total - passed,
        skipped: 0,
        errors: 0,
    };
    let resources = ResourceMetrics {
        duration_sec,
        memory_mb: 100.0,
        cpu_percent: 10.0,
        io_read_mb: 1.0,
        io_write_mb: 1.0,
    };
    MetricsRun::new(VersionId::new(version), "unit", totals, resources)
}

#[test]
fn negative_index_resolves_from_the_end() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MetricsStore::new(tmp.path().join("metrics.json")).unwrap();
    store.append(run("v1", 9, 10, 1.0)).unwrap();
    store.append(run("v2", 10, 10, 1.0)).unwrap();

    let last = store.get_metrics_by_id(MetricsId::Index(-1), None).unwrap();
    assert_eq!(last.version_id, VersionId::new("v2"));
}

#[test]
fn out_of_range_index_returns_none() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MetricsStore::new(tmp.path().join("metrics.json")).unwrap();
    store.append(run("v1", 10, 10, 1.0)).unwrap();
    assert!(store.get_metrics_by_id(MetricsId::Index(5), None).is_none());
}

#[test]
fn compare_metrics_reports_regression_in_success_rate() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MetricsStore::new(tmp.path().join("metrics.json")).unwrap();
    store.append(run("v1", 10, 10, 1.0)).unwrap();
    store.append(run("v2", 8, 10, 1.2)).unwrap();

    let comparison = store.compare_metrics(0i64, 1i64, None).unwrap();
    let success_rate = &comparison["success_rate"];
    assert_eq!(success_rate.baseline, 100.0);
    assert_eq!(success_rate.current, 80.0);
    assert_eq!(success_rate.direction, Direction::Decrease);

    let duration = &comparison["duration_sec"];
    assert_eq!(duration.direction, Direction::Increase);
}

#[test]
fn store_reloads_persisted_history() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("metrics.json");
    {
        let store = MetricsStore::new(path.clone()).unwrap();
        store.append(run("v1", 10, 10, 1.0)).unwrap();
    }
    let reopened = MetricsStore::new(path).unwrap();
    assert_eq!(reopened.history(None).len(), 1);
}
