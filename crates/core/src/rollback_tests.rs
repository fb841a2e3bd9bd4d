// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_rollback_event_defaults_to_unsuccessful_unvalidated() {
    let event = RollbackEvent::new(VersionId::new("v1"), "manual_rollback", PathBuf::from("/tmp/x"));
    assert!(!event.success);
    assert!(!event.safety_validated);
    assert!(!event.used_fallback);
    assert!(event.verification.is_none());
}
