// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn version_id_preserves_caller_chosen_string() {
    let id = VersionId::new("v1");
    assert_eq!(id.as_str(), "v1");
    assert_eq!(id.to_string(), "v1");
}

#[test]
fn version_id_from_string_and_str_agree() {
    assert_eq!(VersionId::from("v1".to_string()), VersionId::from("v1"));
}

#[test]
fn baseline_id_borrows_as_str_for_map_lookup() {
    use std::collections::HashMap;
    let mut map: HashMap<BaselineId, u32> = HashMap::new();
    map.insert(BaselineId::new("nightly"), 1);
    assert_eq!(map.get("nightly"), Some(&1));
}

#[test]
fn ids_are_ordered_lexicographically() {
    assert!(VersionId::new("v1") < VersionId::new("v2"));
}
