// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component adapter data model: the lifecycle state, execution result, and
//! closed set of recognized external worker types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Recognized `componentType` values. Closed set — there is no `Custom`
/// variant because the core only ever dispatches to these three worker
/// families; an adapter for anything else lives outside the core contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Dgm,
    Openevolve,
    Seal,
}

crate::simple_display! {
    ComponentType {
        Dgm => "dgm",
        Openevolve => "openevolve",
        Seal => "seal",
    }
}

/// Lifecycle state of one registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Uninitialized,
    Initializing,
    Ready,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

crate::simple_display! {
    ComponentState {
        Uninitialized => "uninitialized",
        Initializing => "initializing",
        Ready => "ready",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Failed => "failed",
    }
}

impl ComponentState {
    /// A component never goes from `Failed` straight to `Running` — it must
    /// pass back through `Initializing` first.
    pub fn can_transition_to(self, next: ComponentState) -> bool {
        !(self == ComponentState::Failed && next == ComponentState::Running)
    }
}

/// Owned per-component status record. The orchestrator holds one
/// of these per registered adapter; adapters never hand these out directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub state: ComponentState,
    pub message: String,
    pub last_updated: chrono::DateTime<chrono::Utc>,
    pub error: Option<String>,
}

impl ComponentStatus {
    pub fn new(state: ComponentState, message: impl Into<String>) -> Self {
        Self { state, message: message.into(), last_updated: chrono::Utc::now(), error: None }
    }

    pub fn uninitialized() -> Self {
        Self::new(ComponentState::Uninitialized, "not yet initialized")
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            state: ComponentState::Failed,
            message: error.clone(),
            last_updated: chrono::Utc::now(),
            error: Some(error),
        }
    }

    /// Attempt the transition, enforcing the failed→running invariant.
    /// Returns `false` (leaving the status untouched) if the transition is
    /// illegal.
    pub fn transition(&mut self, next: ComponentState, message: impl Into<String>) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.message = message.into();
        self.last_updated = chrono::Utc::now();
        self.error = if next == ComponentState::Failed { Some(self.message.clone()) } else { None };
        true
    }
}

/// Outcome of one `ComponentAdapter::execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub execution_time: Duration,
    pub metadata: serde_json::Map<String, Value>,
}

impl ComponentResult {
    pub fn ok(data: Value, execution_time: Duration) -> Self {
        Self { success: true, data: Some(data), error: None, execution_time, metadata: Default::default() }
    }

    pub fn err(error: impl Into<String>, execution_time: Duration) -> Self {
        Self { success: false, data: None, error: Some(error.into()), execution_time, metadata: Default::default() }
    }

    pub fn unknown_operation(operation: &str, execution_time: Duration) -> Self {
        Self::err(format!("Unknown operation: {operation}"), execution_time)
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod tests;
