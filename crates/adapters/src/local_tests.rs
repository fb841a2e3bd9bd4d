// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::operation::{DgmOperation, Operation, SealOperation};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

struct EchoWorker {
    calls: AtomicUsize,
}

#[async_trait]
impl ComponentWorker for EchoWorker {
    async fn call(&self, operation: &Operation) -> ComponentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ComponentResult::ok(json!({"operation": operation.name()}), std::time::Duration::ZERO)
    }
}

fn adapter() -> LocalAdapter {
    LocalAdapter::new(ComponentType::Dgm, Arc::new(EchoWorker { calls: AtomicUsize::new(0) }))
}

#[tokio::test]
async fn initialize_then_start_reaches_running() {
    let adapter = adapter();
    assert!(adapter.initialize().await);
    assert_eq!(adapter.get_status().await.state, ComponentState::Ready);
    assert!(adapter.start().await);
    assert_eq!(adapter.get_status().await.state, ComponentState::Running);
}

#[tokio::test]
async fn execute_before_ready_fails_without_reaching_worker() {
    let adapter = adapter();
    let result = adapter.execute(Operation::Dgm(DgmOperation::AdvanceGeneration(json!({})))).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("component not ready"));
}

#[tokio::test]
async fn execute_dispatches_to_worker_once_running() {
    let adapter = adapter();
    assert!(adapter.initialize().await);
    assert!(adapter.start().await);

    let result = adapter.execute(Operation::Dgm(DgmOperation::AdvanceGeneration(json!({"x": 1})))).await;
    assert!(result.success);
    assert_eq!(result.data, Some(json!({"operation": "advance_generation"})));
}

#[tokio::test]
async fn execute_rejects_mismatched_component_type() {
    let adapter = adapter();
    assert!(adapter.initialize().await);
    assert!(adapter.start().await);

    let result = adapter.execute(Operation::Seal(SealOperation::SubmitPrompt("hi".into()))).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Unknown operation: submit_prompt"));
}

#[tokio::test]
async fn stop_is_safe_to_call_repeatedly() {
    let adapter = adapter();
    assert!(adapter.initialize().await);
    assert!(adapter.start().await);
    assert!(adapter.stop().await);
    assert_eq!(adapter.get_status().await.state, ComponentState::Stopped);
    assert!(adapter.stop().await);
    assert_eq!(adapter.get_status().await.state, ComponentState::Stopped);
}
