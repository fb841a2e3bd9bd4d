// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn failed_cannot_transition_directly_to_running() {
    let mut status = ComponentStatus::failed("boom");
    assert!(!status.transition(ComponentState::Running, "resumed"));
    assert_eq!(status.state, ComponentState::Failed);
}

#[test]
fn failed_can_transition_through_initializing_then_running() {
    let mut status = ComponentStatus::failed("boom");
    assert!(status.transition(ComponentState::Initializing, "retrying"));
    assert!(status.transition(ComponentState::Running, "up"));
    assert_eq!(status.state, ComponentState::Running);
    assert!(status.error.is_none());
}

#[test]
fn transition_to_failed_records_message_as_error() {
    let mut status = ComponentStatus::new(ComponentState::Running, "up");
    assert!(status.transition(ComponentState::Failed, "crashed"));
    assert_eq!(status.error.as_deref(), Some("crashed"));
}

#[test]
fn unknown_operation_result_is_unsuccessful() {
    let r = ComponentResult::unknown_operation("frobnicate", Duration::from_millis(1));
    assert!(!r.success);
    assert_eq!(r.error.as_deref(), Some("Unknown operation: frobnicate"));
}

#[test]
fn component_type_displays_wire_names() {
    assert_eq!(ComponentType::Dgm.to_string(), "dgm");
    assert_eq!(ComponentType::Openevolve.to_string(), "openevolve");
    assert_eq!(ComponentType::Seal.to_string(), "seal");
}
