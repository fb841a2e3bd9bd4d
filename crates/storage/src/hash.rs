// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integrity hash used by the checkpoint store: SHA-256 over the
//! content of each tracked file, aggregated into a single SHA-256 digest over
//! the sorted `(relPath, fileHash)` pairs so the aggregate is independent of
//! directory iteration order.

use sha2::{Digest, Sha256};

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Aggregate a checkpoint's integrity hash from its per-file hashes.
/// `entries` need not be pre-sorted; this sorts by `relPath` for a canonical
/// ordering before hashing.
pub fn aggregate<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut sorted: Vec<(&str, &str)> = entries.collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (rel_path, file_hash) in sorted {
        hasher.update(rel_path.as_bytes());
        hasher.update(b"\0");
        hasher.update(file_hash.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
