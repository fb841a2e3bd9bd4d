// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The component adapter contract and its generic lifecycle
//! bookkeeping. The actual worker logic (in-process or over HTTP) is
//! supplied by `LocalAdapter`/`RemoteAdapter` in sibling modules; this file
//! only defines the trait every adapter implements and the status tracker
//! both share.

use std::time::Instant;

use async_trait::async_trait;
use evoseal_core::{ComponentResult, ComponentState, ComponentStatus, ComponentType};
use parking_lot::Mutex;

use crate::operation::Operation;

#[async_trait]
pub trait ComponentAdapter: Send + Sync {
    fn component_type(&self) -> ComponentType;

    /// Idempotent; returns `false` and records the error on failure rather
    /// than propagating it.
    async fn initialize(&self) -> bool;

    async fn start(&self) -> bool;
    async fn stop(&self) -> bool;

    async fn execute(&self, operation: Operation) -> ComponentResult;

    async fn get_metrics(&self) -> serde_json::Map<String, serde_json::Value>;

    async fn get_status(&self) -> ComponentStatus;
}

/// Shared status tracker adapters delegate to so `initialize`/`start`/`stop`
/// consistently enforce the failed→running transition invariant.
pub(crate) struct StatusTracker {
    status: Mutex<ComponentStatus>,
}

impl StatusTracker {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(ComponentStatus::uninitialized()),
        }
    }

    pub(crate) fn transition(&self, next: ComponentState, message: impl Into<String>) -> bool {
        self.status.lock().transition(next, message)
    }

    pub(crate) fn set_failed(&self, error: impl Into<String>) {
        *self.status.lock() = ComponentStatus::failed(error);
    }

    pub(crate) fn snapshot(&self) -> ComponentStatus {
        self.status.lock().clone()
    }

    pub(crate) fn is_ready_or_running(&self) -> bool {
        matches!(self.status.lock().state, ComponentState::Ready | ComponentState::Running)
    }
}

pub(crate) fn timed(start: Instant) -> std::time::Duration {
    start.elapsed()
}
