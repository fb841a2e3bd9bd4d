// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn metadata(version_id: &str, created_at: chrono::DateTime<chrono::Utc>) -> CheckpointMetadata {
    CheckpointMetadata {
        version_id: VersionId::new(version_id),
        parent_id: None,
        created_at,
        timestamp: created_at,
        file_count: 1,
        total_bytes: 10,
        integrity_hash: "deadbeef".into(),
        compression: Compression::None,
        system_state_captured: false,
        config_snapshot: Value::Null,
        metrics_count: 0,
    }
}

#[test]
fn retention_key_breaks_ties_by_version_id() {
    let t = chrono::Utc::now();
    let a = metadata("v1", t);
    let b = metadata("v2", t);
    assert!(a.retention_key() < b.retention_key());
}

#[test]
fn compression_defaults_to_none() {
    assert_eq!(Compression::default(), Compression::None);
}

#[test]
fn compression_serializes_as_snake_case() {
    let s = serde_json::to_string(&Compression::Gzip).unwrap();
    assert_eq!(s, "\"gzip\"");
}
