// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn success_rate_is_zero_when_no_tests_ran() {
    let totals = MetricsTotals::default();
    assert_eq!(totals.success_rate(), 0.0);
}

#[test]
fn success_rate_divides_passed_by_run() {
    let totals = MetricsTotals { tests_run: 10, passed: 8, failed: 2, skipped: 0, errors: 0 };
    assert!((totals.success_rate() - 0.8).abs() < f64::EPSILON);
}

#[test]
fn metrics_run_new_computes_success_rate_from_totals() {
    let totals = MetricsTotals { tests_run: 4, passed: 3, failed: 1, skipped: 0, errors: 0 };
    let run = MetricsRun::new(VersionId::new("v1"), "unit", totals, ResourceMetrics::default());
    assert!((run.success_rate - 0.75).abs() < f64::EPSILON);
}
