// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named baseline storage. A baseline snapshots a
//! version's metrics under a caller-chosen name so later versions can be
//! compared against a stable reference instead of only their immediate
//! predecessor. The regression-aware comparison lives in `evoseal-engine`;
//! this store only owns persistence.

use std::path::PathBuf;

use evoseal_core::ids::{BaselineId, VersionId};
use evoseal_core::metrics::Baseline;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{io, Result, StorageError};

pub struct BaselineStore {
    path: PathBuf,
    baselines: Mutex<IndexMap<String, Baseline>>,
}

impl BaselineStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let baselines = if path.exists() {
            let bytes = std::fs::read(&path).map_err(io(&path))?;
            let list: Vec<Baseline> = serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
                what: "baselines",
                source,
            })?;
            list.into_iter().map(|b| (b.name.as_str().to_string(), b)).collect()
        } else {
            IndexMap::new()
        };
        Ok(Self {
            path,
            baselines: Mutex::new(baselines),
        })
    }

    pub fn establish(&self, name: BaselineId, version_id: VersionId, metrics: serde_json::Map<String, Value>) -> Result<Baseline> {
        let baseline = Baseline {
            name: name.clone(),
            version_id,
            metrics,
            created_at: chrono::Utc::now(),
        };
        let mut baselines = self.baselines.lock();
        baselines.insert(name.as_str().to_string(), baseline.clone());
        self.persist(&baselines)?;
        Ok(baseline)
    }

    pub fn get(&self, name: &str) -> Option<Baseline> {
        self.baselines.lock().get(name).cloned()
    }

    pub fn list(&self) -> Vec<Baseline> {
        self.baselines.lock().values().cloned().collect()
    }

    fn persist(&self, baselines: &IndexMap<String, Baseline>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io(parent))?;
        }
        let list: Vec<&Baseline> = baselines.values().collect();
        let bytes = serde_json::to_vec_pretty(&list).map_err(|source| StorageError::Serde {
            what: "baselines",
            source,
        })?;
        std::fs::write(&self.path, bytes).map_err(io(&self.path))
    }
}

#[cfg(test)]
#[path = "baseline_tests.rs"]
mod tests;
