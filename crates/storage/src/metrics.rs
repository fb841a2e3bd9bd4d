// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only metrics store: one `MetricsRun` row per test run,
//! persisted as a single JSON array, with index/timestamp-prefix lookup and
//! pairwise comparison.

use std::path::PathBuf;

use evoseal_core::metrics::MetricsRun;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{io, Result, StorageError};

/// Identifies a run within the store for `get_metrics_by_id`/`compare_metrics`.
pub enum MetricsId {
    /// Index into the (test-type-filtered) history, negative counts from the end.
    Index(i64),
    /// Latest run whose RFC-3339 timestamp starts with this prefix.
    TimestampPrefix(String),
}

impl From<i64> for MetricsId {
    fn from(i: i64) -> Self {
        MetricsId::Index(i)
    }
}

impl From<&str> for MetricsId {
    fn from(s: &str) -> Self {
        MetricsId::TimestampPrefix(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricDelta {
    pub baseline: f64,
    pub current: f64,
    pub difference: f64,
    pub change_pct: f64,
    pub direction: Direction,
}

fn delta(baseline: f64, current: f64) -> MetricDelta {
    let difference = current - baseline;
    let change_pct = if baseline != 0.0 { difference / baseline * 100.0 } else { 0.0 };
    MetricDelta {
        baseline,
        current,
        difference,
        change_pct,
        direction: if difference >= 0.0 { Direction::Increase } else { Direction::Decrease },
    }
}

pub struct MetricsStore {
    path: PathBuf,
    temp_path: PathBuf,
    runs: Mutex<Vec<MetricsRun>>,
}

impl MetricsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let runs = if path.exists() {
            let bytes = std::fs::read(&path).map_err(io(&path))?;
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
                what: "metrics history",
                source,
            })?
        } else {
            Vec::new()
        };
        let temp_path = path.with_extension("json.tmp");
        Ok(Self {
            path,
            temp_path,
            runs: Mutex::new(runs),
        })
    }

    pub fn append(&self, run: MetricsRun) -> Result<()> {
        let mut runs = self.runs.lock();
        runs.push(run);
        self.persist(&runs)
    }

    /// Write-temp-then-rename: a reader re-reading the file mid-append
    /// never observes a truncated or partially written array.
    fn persist(&self, runs: &[MetricsRun]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io(parent))?;
        }
        let bytes = serde_json::to_vec_pretty(runs).map_err(|source| StorageError::Serde {
            what: "metrics history",
            source,
        })?;
        std::fs::write(&self.temp_path, &bytes).map_err(io(&self.temp_path))?;
        std::fs::rename(&self.temp_path, &self.path).map_err(io(&self.path))
    }

    /// All runs matching `test_type` (or all runs, if `None`), oldest first.
    pub fn history(&self, test_type: Option<&str>) -> Vec<MetricsRun> {
        let runs = self.runs.lock();
        let mut filtered: Vec<MetricsRun> = runs
            .iter()
            .filter(|r| test_type.map_or(true, |t| r.test_type == t))
            .cloned()
            .collect();
        filtered.sort_by_key(|r| r.timestamp);
        filtered
    }

    pub fn get_metrics_by_id(&self, id: MetricsId, test_type: Option<&str>) -> Option<MetricsRun> {
        let history = self.history(test_type);
        if history.is_empty() {
            return None;
        }
        match id {
            MetricsId::Index(idx) => {
                let len = history.len() as i64;
                let resolved = if idx < 0 { len + idx } else { idx };
                if resolved < 0 || resolved >= len {
                    None
                } else {
                    Some(history[resolved as usize].clone())
                }
            }
            MetricsId::TimestampPrefix(prefix) => history
                .into_iter()
                .rev()
                .find(|r| r.timestamp.to_rfc3339().starts_with(&prefix)),
        }
    }

    pub fn compare_metrics(
        &self,
        old_id: impl Into<MetricsId>,
        new_id: impl Into<MetricsId>,
        test_type: Option<&str>,
    ) -> Result<indexmap::IndexMap<String, MetricDelta>> {
        let baseline = self
            .get_metrics_by_id(old_id.into(), test_type)
            .ok_or_else(|| StorageError::MetricsNotFound("baseline run".to_string()))?;
        let current = self
            .get_metrics_by_id(new_id.into(), test_type)
            .ok_or_else(|| StorageError::MetricsNotFound("comparison run".to_string()))?;

        let mut out = indexmap::IndexMap::new();
        out.insert("success_rate".to_string(), delta(baseline.success_rate * 100.0, current.success_rate * 100.0));
        out.insert("duration_sec".to_string(), delta(baseline.resources.duration_sec, current.resources.duration_sec));
        out.insert("cpu_percent".to_string(), delta(baseline.resources.cpu_percent, current.resources.cpu_percent));
        out.insert("memory_mb".to_string(), delta(baseline.resources.memory_mb, current.resources.memory_mb));
        out.insert("io_read_mb".to_string(), delta(baseline.resources.io_read_mb, current.resources.io_read_mb));
        out.insert("io_write_mb".to_string(), delta(baseline.resources.io_write_mb, current.resources.io_write_mb));
        out.insert(
            "tests_total".to_string(),
            delta(baseline.totals.tests_run as f64, current.totals.tests_run as f64),
        );
        Ok(out)
    }
}

#[cfg(test)]
#[path = "metrics_store_tests.rs"]
mod tests;
