// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restoration-target safety predicate, shared by the checkpoint store's
//! `restore_checkpoint` and the rollback engine. A destructive restore must
//! never land on `/`, a well-known system directory, or an ancestor of the
//! calling process's own working directory — the bug this guards against is
//! a rollback wiping out the repository that is driving it.

use std::path::{Path, PathBuf};

const DENYLIST: &[&str] = &["/", "/home", "/usr", "/var", "/etc", "/opt"];

/// Result of validating an intended restoration target.
pub struct SafeTarget {
    pub path: PathBuf,
    pub used_fallback: bool,
}

/// Validate `requested` as a restoration target relative to `cwd`.
///
/// If `requested` resolves to a denylisted system directory or an ancestor
/// of (or equal to) `cwd`, this does not error: it substitutes
/// `<cwd>/.evoseal/rollback_target`, creating it if necessary, and reports
/// `used_fallback = true` so callers can record it on the rollback event.
pub fn validate_restoration_target(cwd: &Path, requested: &Path) -> std::io::Result<SafeTarget> {
    let canonical_cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        cwd.join(requested)
    };
    let canonical_candidate = candidate.canonicalize().unwrap_or(candidate);

    if is_dangerous(&canonical_cwd, &canonical_candidate) {
        let fallback = canonical_cwd.join(".evoseal").join("rollback_target");
        std::fs::create_dir_all(&fallback)?;
        return Ok(SafeTarget {
            path: fallback,
            used_fallback: true,
        });
    }

    std::fs::create_dir_all(&canonical_candidate)?;
    Ok(SafeTarget {
        path: canonical_candidate,
        used_fallback: false,
    })
}

fn is_dangerous(cwd: &Path, candidate: &Path) -> bool {
    if DENYLIST.iter().any(|d| candidate == Path::new(d)) {
        return true;
    }
    if candidate == cwd {
        return true;
    }
    if let Some(parent) = cwd.parent() {
        if candidate == parent {
            return true;
        }
    }
    // Any ancestor of cwd (including cwd itself, already checked above).
    cwd.ancestors().any(|ancestor| ancestor == candidate)
}

#[cfg(test)]
#[path = "safety_tests.rs"]
mod tests;
