// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders and fixtures shared across crates. Gated behind
//! `cfg(any(test, feature = "test-support"))` so downstream crates can
//! depend on `evoseal-core/test-support` from their own `dev-dependencies`
//! without pulling these into production builds.

use crate::checkpoint::{Compression, CheckpointMetadata};
use crate::ids::VersionId;
use crate::metrics::{MetricsRun, MetricsTotals, ResourceMetrics};
use serde_json::Value;

/// A checkpoint metadata record with plausible defaults, for tests that
/// don't care about every field.
pub fn sample_checkpoint_metadata(version_id: &str, parent_id: Option<&str>) -> CheckpointMetadata {
    let now = chrono::Utc::now();
    CheckpointMetadata {
        version_id: VersionId::new(version_id),
        parent_id: parent_id.map(VersionId::new),
        created_at: now,
        timestamp: now,
        file_count: 2,
        total_bytes: 128,
        integrity_hash: "0".repeat(64),
        compression: Compression::None,
        system_state_captured: false,
        config_snapshot: Value::Null,
        metrics_count: 0,
    }
}

/// A metrics run with the given success rate (0.0-1.0) and duration,
/// everything else held constant across calls so comparisons are stable.
pub fn sample_metrics_run(version_id: &str, passed: u64, total: u64, duration_sec: f64) -> MetricsRun {
    let totals = MetricsTotals { tests_run: total, passed, failed: total.saturating_sub(passed), skipped: 0, errors: 0 };
    let resources = ResourceMetrics { duration_sec, memory_mb: 100.0, cpu_percent: 10.0, io_read_mb: 1.0, io_write_mb: 1.0 };
    MetricsRun::new(VersionId::new(version_id), "unit", totals, resources)
}
