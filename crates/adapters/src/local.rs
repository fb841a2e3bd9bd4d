// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process adapter: wraps an embedder-supplied worker that already runs
//! inside this process (as opposed to the `remote` module's HTTP job-poll
//! adapters). The worker logic itself — DGM, OpenEvolve, SEAL — is out of
//! scope; this crate only owns the adapter contract around it.

use std::time::Instant;

use async_trait::async_trait;
use evoseal_core::{ComponentResult, ComponentState, ComponentStatus, ComponentType};
use std::sync::Arc;

use crate::adapter::{timed, ComponentAdapter, StatusTracker};
use crate::operation::Operation;

/// An embedder-supplied in-process implementation of one component.
#[async_trait]
pub trait ComponentWorker: Send + Sync {
    async fn call(&self, operation: &Operation) -> ComponentResult;
}

pub struct LocalAdapter {
    component_type: ComponentType,
    worker: Arc<dyn ComponentWorker>,
    status: StatusTracker,
}

impl LocalAdapter {
    pub fn new(component_type: ComponentType, worker: Arc<dyn ComponentWorker>) -> Self {
        Self {
            component_type,
            worker,
            status: StatusTracker::new(),
        }
    }
}

#[async_trait]
impl ComponentAdapter for LocalAdapter {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    async fn initialize(&self) -> bool {
        self.status.transition(ComponentState::Initializing, "initializing") && self.status.transition(ComponentState::Ready, "ready")
    }

    async fn start(&self) -> bool {
        self.status.transition(ComponentState::Starting, "starting") && self.status.transition(ComponentState::Running, "running")
    }

    async fn stop(&self) -> bool {
        self.status.transition(ComponentState::Stopping, "stopping") && self.status.transition(ComponentState::Stopped, "stopped")
    }

    async fn execute(&self, operation: Operation) -> ComponentResult {
        let start = Instant::now();
        if operation.component_type() != self.component_type {
            return ComponentResult::unknown_operation(operation.name(), timed(start));
        }
        if !self.status.is_ready_or_running() {
            return ComponentResult::err("component not ready", timed(start));
        }
        self.worker.call(&operation).await
    }

    async fn get_metrics(&self) -> serde_json::Map<String, serde_json::Value> {
        Default::default()
    }

    async fn get_status(&self) -> ComponentStatus {
        self.status.snapshot()
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
