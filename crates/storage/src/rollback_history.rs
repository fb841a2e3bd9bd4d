// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only rollback event log. Written
//! with a write-temp-then-rename so a crash mid-write can never leave
//! `rollback_history.json` truncated or invalid.

use std::fs;
use std::path::PathBuf;

use evoseal_core::RollbackEvent;
use parking_lot::Mutex;

use crate::error::{io, Result, StorageError};

pub struct RollbackHistoryStore {
    path: PathBuf,
    temp_path: PathBuf,
    events: Mutex<Vec<RollbackEvent>>,
}

impl RollbackHistoryStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let events = if path.exists() {
            let bytes = fs::read(&path).map_err(io(&path))?;
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
                what: "rollback history",
                source,
            })?
        } else {
            Vec::new()
        };
        let temp_path = path.with_extension("json.tmp");
        Ok(Self {
            path,
            temp_path,
            events: Mutex::new(events),
        })
    }

    pub fn append(&self, event: RollbackEvent) -> Result<()> {
        let mut events = self.events.lock();
        events.push(event);
        self.persist(&events)
    }

    fn persist(&self, events: &[RollbackEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io(parent))?;
        }
        let bytes = serde_json::to_vec_pretty(events).map_err(|source| StorageError::Serde {
            what: "rollback history",
            source,
        })?;
        fs::write(&self.temp_path, &bytes).map_err(io(&self.temp_path))?;
        fs::rename(&self.temp_path, &self.path).map_err(io(&self.path))?;
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    /// Most recent events first; truncated to `limit` if given.
    pub fn history(&self, limit: Option<usize>) -> Vec<RollbackEvent> {
        let mut events: Vec<RollbackEvent> = self.events.lock().clone();
        events.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        events
    }
}

#[cfg(test)]
#[path = "rollback_history_tests.rs"]
mod tests;
