// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed checkpoint store. Each version gets a
//! `checkpoint_<versionId>/` directory holding its tracked files (or, under
//! gzip compression, a single `content.tar.gz` bundle) plus a `metadata.json`
//! sidecar and, when requested, a `system_state.json` snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use evoseal_core::ids::VersionId;
use evoseal_core::{CheckpointMetadata, Compression, SystemStateSnapshot};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io, Result, StorageError};
use crate::hash;

const METADATA_FILE: &str = "metadata.json";
const SYSTEM_STATE_FILE: &str = "system_state.json";
const BUNDLE_FILE: &str = "content.tar.gz";
const PROTECTED_DIRS: &[&str] = &[".git", ".evoseal", "__pycache__", ".pytest_cache", "node_modules"];

/// Content for one tracked file in a checkpoint.
pub enum FileContent {
    Inline(Vec<u8>),
    CopyFrom(PathBuf),
}

impl FileContent {
    fn read(&self) -> Result<Vec<u8>> {
        match self {
            FileContent::Inline(bytes) => Ok(bytes.clone()),
            FileContent::CopyFrom(path) => fs::read(path).map_err(io(path)),
        }
    }
}

/// Input to `CheckpointStore::create_checkpoint`, corresponding to the
/// version data the embedder hands in.
#[derive(Default)]
pub struct CheckpointInput {
    pub parent_id: Option<VersionId>,
    pub timestamp: Option<DateTime<Utc>>,
    pub changes: BTreeMap<String, FileContent>,
    pub config_snapshot: Value,
    pub system_state: Option<SystemStateSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointStoreConfig {
    pub checkpoint_directory: PathBuf,
    pub max_checkpoints: usize,
    pub compression: Compression,
}

impl Default for CheckpointStoreConfig {
    fn default() -> Self {
        Self {
            checkpoint_directory: PathBuf::from("./checkpoints"),
            max_checkpoints: 100,
            compression: Compression::None,
        }
    }
}

/// Outcome of a restore operation.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub success: bool,
    pub restored_files: usize,
    pub system_state: Option<SystemStateSnapshot>,
    pub integrity_verified: bool,
}

pub struct CheckpointStore {
    root: PathBuf,
    max_checkpoints: usize,
    compression: Compression,
}

impl CheckpointStore {
    pub fn new(config: CheckpointStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.checkpoint_directory).map_err(io(&config.checkpoint_directory))?;
        Ok(Self {
            root: config.checkpoint_directory,
            max_checkpoints: config.max_checkpoints,
            compression: config.compression,
        })
    }

    fn checkpoint_dir(&self, version_id: &VersionId) -> PathBuf {
        self.root.join(format!("checkpoint_{}", version_id.as_str()))
    }

    fn backups_root(&self) -> PathBuf {
        self.root.join("restoration_backups")
    }

    pub fn create_checkpoint(
        &self,
        version_id: &VersionId,
        input: &CheckpointInput,
        capture_system_state: bool,
    ) -> Result<PathBuf> {
        for rel_path in input.changes.keys() {
            reject_traversal(rel_path)?;
        }

        let dir = self.checkpoint_dir(version_id);
        fs::create_dir_all(&dir).map_err(io(&dir))?;

        let mut file_hashes = Vec::with_capacity(input.changes.len());
        let mut total_bytes = 0u64;

        match self.compression {
            Compression::None => {
                for (rel_path, content) in &input.changes {
                    let bytes = content.read()?;
                    total_bytes += bytes.len() as u64;
                    file_hashes.push((rel_path.clone(), hash::hash_bytes(&bytes)));
                    let dest = dir.join(rel_path);
                    if let Some(parent) = dest.parent() {
                        fs::create_dir_all(parent).map_err(io(parent))?;
                    }
                    fs::write(&dest, &bytes).map_err(io(&dest))?;
                }
            }
            Compression::Gzip => {
                let bundle_path = dir.join(BUNDLE_FILE);
                let file = fs::File::create(&bundle_path).map_err(io(&bundle_path))?;
                let encoder = GzEncoder::new(file, flate2::Compression::default());
                let mut builder = tar::Builder::new(encoder);
                for (rel_path, content) in &input.changes {
                    let bytes = content.read()?;
                    total_bytes += bytes.len() as u64;
                    file_hashes.push((rel_path.clone(), hash::hash_bytes(&bytes)));
                    let mut header = tar::Header::new_gnu();
                    header.set_size(bytes.len() as u64);
                    header.set_mode(0o644);
                    header.set_cksum();
                    builder
                        .append_data(&mut header, rel_path, bytes.as_slice())
                        .map_err(io(&bundle_path))?;
                }
                builder
                    .into_inner()
                    .map_err(io(&bundle_path))?
                    .finish()
                    .map_err(io(&bundle_path))?;
            }
        }

        let integrity_hash = hash::aggregate(file_hashes.iter().map(|(p, h)| (p.as_str(), h.as_str())));
        let now = Utc::now();
        let system_state_captured = capture_system_state && input.system_state.is_some();
        if system_state_captured {
            if let Some(state) = input.system_state.as_ref() {
                write_json(&dir.join(SYSTEM_STATE_FILE), state)?;
            }
        }

        let metadata = CheckpointMetadata {
            version_id: version_id.clone(),
            parent_id: input.parent_id.clone(),
            created_at: now,
            timestamp: input.timestamp.unwrap_or(now),
            file_count: input.changes.len(),
            total_bytes,
            integrity_hash,
            compression: self.compression,
            system_state_captured,
            config_snapshot: input.config_snapshot.clone(),
            metrics_count: 0,
        };
        write_json(&dir.join(METADATA_FILE), &metadata)?;

        tracing::info!(version_id = %version_id, files = metadata.file_count, "created checkpoint");

        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() > self.max_checkpoints {
            self.cleanup_old_checkpoints(self.max_checkpoints)?;
        }

        Ok(dir)
    }

    pub fn restore_checkpoint(
        &self,
        version_id: &VersionId,
        target_dir: &Path,
        verify_integrity: bool,
    ) -> Result<RestoreOutcome> {
        let metadata = self.get_metadata(version_id)?;
        let dir = self.checkpoint_dir(version_id);

        let integrity_verified = if verify_integrity {
            let computed = self.recompute_integrity_hash(version_id, &metadata)?;
            if computed != metadata.integrity_hash {
                return Err(StorageError::IntegrityMismatch {
                    version_id: version_id.as_str().to_string(),
                    expected: metadata.integrity_hash.clone(),
                    computed,
                });
            }
            true
        } else {
            false
        };

        fs::create_dir_all(target_dir).map_err(io(target_dir))?;
        clear_except_protected(target_dir)?;

        match metadata.compression {
            Compression::None => {
                copy_tree_excluding(&dir, target_dir, &[METADATA_FILE, SYSTEM_STATE_FILE])?;
            }
            Compression::Gzip => {
                let bundle_path = dir.join(BUNDLE_FILE);
                let file = fs::File::open(&bundle_path).map_err(io(&bundle_path))?;
                let decoder = GzDecoder::new(file);
                let mut archive = tar::Archive::new(decoder);
                archive.unpack(target_dir).map_err(io(target_dir))?;
            }
        }

        let system_state = if metadata.system_state_captured {
            read_json(&dir.join(SYSTEM_STATE_FILE)).ok()
        } else {
            None
        };

        // Count what actually landed on disk rather than trusting the
        // recorded `file_count` — the two are compared against each other
        // by callers doing post-restoration verification (spec §4.4 step 5),
        // so this must reflect reality even if `metadata.json` was tampered
        // with or is stale.
        let restored_files = count_entries(target_dir)?;

        tracing::info!(version_id = %version_id, target = %target_dir.display(), restored_files, "restored checkpoint");

        Ok(RestoreOutcome {
            success: true,
            restored_files,
            system_state,
            integrity_verified,
        })
    }

    pub fn restore_checkpoint_with_validation(
        &self,
        version_id: &VersionId,
        target_dir: &Path,
        backup_current: bool,
    ) -> Result<RestoreOutcome> {
        // Pre-validate: existence and metadata parse.
        let metadata = self.get_metadata(version_id)?;

        if backup_current && target_dir.exists() {
            let backup_dir = self
                .backups_root()
                .join(format!("backup_{}_{}", version_id.as_str(), Utc::now().format("%Y%m%dT%H%M%S%.f")));
            fs::create_dir_all(&backup_dir).map_err(io(&backup_dir))?;
            copy_tree_excluding(target_dir, &backup_dir, &[])?;
        }

        let outcome = self.restore_checkpoint(version_id, target_dir, true)?;

        if outcome.restored_files != metadata.file_count {
            tracing::warn!(
                version_id = %version_id,
                expected = metadata.file_count,
                actual = outcome.restored_files,
                "restored file count does not match checkpoint metadata"
            );
        }

        Ok(outcome)
    }

    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointMetadata>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root).map_err(io(&self.root))? {
            let entry = entry.map_err(io(&self.root))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("checkpoint_") {
                continue;
            }
            let metadata_path = path.join(METADATA_FILE);
            if !metadata_path.exists() {
                continue;
            }
            match read_json::<CheckpointMetadata>(&metadata_path) {
                Ok(metadata) => out.push(metadata),
                Err(err) => tracing::warn!(path = %metadata_path.display(), %err, "failed to read checkpoint metadata"),
            }
        }
        out.sort_by(|a, b| a.retention_key().cmp(&b.retention_key()));
        Ok(out)
    }

    pub fn get_metadata(&self, version_id: &VersionId) -> Result<CheckpointMetadata> {
        let path = self.checkpoint_dir(version_id).join(METADATA_FILE);
        if !path.exists() {
            return Err(StorageError::CheckpointNotFound(version_id.as_str().to_string()));
        }
        read_json(&path)
    }

    pub fn get_path(&self, version_id: &VersionId) -> Option<PathBuf> {
        let dir = self.checkpoint_dir(version_id);
        dir.join(METADATA_FILE).exists().then_some(dir)
    }

    pub fn delete(&self, version_id: &VersionId) -> Result<bool> {
        let dir = self.checkpoint_dir(version_id);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(io(&dir))?;
        Ok(true)
    }

    pub fn cleanup_old_checkpoints(&self, keep_count: usize) -> Result<usize> {
        let mut checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= keep_count {
            return Ok(0);
        }
        // Newest first; drop everything past `keep_count`.
        checkpoints.sort_by(|a, b| b.retention_key().cmp(&a.retention_key()));
        let to_delete = &checkpoints[keep_count..];
        let mut deleted = 0;
        for metadata in to_delete {
            if self.delete(&metadata.version_id)? {
                deleted += 1;
            }
        }
        tracing::info!(deleted, "cleaned up old checkpoints");
        Ok(deleted)
    }

    pub fn list_restoration_backups(&self) -> Result<Vec<PathBuf>> {
        let root = self.backups_root();
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&root).map_err(io(&root))? {
            let entry = entry.map_err(io(&root))?;
            if entry.path().is_dir() {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn cleanup_restoration_backups(&self, keep_count: usize, max_age_days: i64) -> Result<usize> {
        let mut backups = self.list_restoration_backups()?;
        if backups.is_empty() {
            return Ok(0);
        }
        backups.sort();
        backups.reverse(); // newest first (timestamped names sort lexicographically)

        let cutoff = Utc::now() - chrono::Duration::days(max_age_days);
        let mut deleted = 0;
        for (idx, backup) in backups.iter().enumerate() {
            let too_old = fs::metadata(backup)
                .and_then(|m| m.modified())
                .map(|modified| DateTime::<Utc>::from(modified) < cutoff)
                .unwrap_or(false);
            if idx >= keep_count || too_old {
                fs::remove_dir_all(backup).map_err(io(backup))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Recompute the integrity hash from the checkpoint's stored content,
    /// independent of the recorded metadata, for verification.
    fn recompute_integrity_hash(&self, version_id: &VersionId, metadata: &CheckpointMetadata) -> Result<String> {
        let dir = self.checkpoint_dir(version_id);
        let mut file_hashes = Vec::new();
        match metadata.compression {
            Compression::None => {
                collect_file_hashes(&dir, &dir, &mut file_hashes, &[METADATA_FILE, SYSTEM_STATE_FILE])?;
            }
            Compression::Gzip => {
                let bundle_path = dir.join(BUNDLE_FILE);
                let file = fs::File::open(&bundle_path).map_err(io(&bundle_path))?;
                let decoder = GzDecoder::new(file);
                let mut archive = tar::Archive::new(decoder);
                for entry in archive.entries().map_err(io(&bundle_path))? {
                    let mut entry = entry.map_err(io(&bundle_path))?;
                    let rel_path = entry.path().map_err(io(&bundle_path))?.to_string_lossy().into_owned();
                    let mut bytes = Vec::new();
                    entry.read_to_end(&mut bytes).map_err(io(&bundle_path))?;
                    file_hashes.push((rel_path, hash::hash_bytes(&bytes)));
                }
            }
        }
        Ok(hash::aggregate(file_hashes.iter().map(|(p, h)| (p.as_str(), h.as_str()))))
    }
}

fn reject_traversal(rel_path: &str) -> Result<()> {
    let path = Path::new(rel_path);
    if path.is_absolute() || path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(StorageError::PathTraversal(rel_path.to_string()));
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serde {
        what: "checkpoint record",
        source,
    })?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &bytes).map_err(io(&temp_path))?;
    fs::rename(&temp_path, path).map_err(io(path))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(io(path))?;
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Serde {
        what: "checkpoint record",
        source,
    })
}

fn clear_except_protected(target_dir: &Path) -> Result<()> {
    if !target_dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(target_dir).map_err(io(target_dir))? {
        let entry = entry.map_err(io(target_dir))?;
        let name = entry.file_name();
        if PROTECTED_DIRS.iter().any(|p| name == std::ffi::OsStr::new(p)) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(io(&path))?;
        } else {
            fs::remove_file(&path).map_err(io(&path))?;
        }
    }
    Ok(())
}

fn copy_tree_excluding(src: &Path, dst: &Path, exclude: &[&str]) -> Result<()> {
    for entry in fs::read_dir(src).map_err(io(src))? {
        let entry = entry.map_err(io(src))?;
        let name = entry.file_name();
        if exclude.iter().any(|e| name == std::ffi::OsStr::new(e)) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        if src_path.is_dir() {
            fs::create_dir_all(&dst_path).map_err(io(&dst_path))?;
            copy_tree_excluding(&src_path, &dst_path, &[])?;
        } else {
            if let Some(parent) = dst_path.parent() {
                fs::create_dir_all(parent).map_err(io(parent))?;
            }
            fs::copy(&src_path, &dst_path).map_err(io(&dst_path))?;
        }
    }
    Ok(())
}

fn collect_file_hashes(root: &Path, dir: &Path, out: &mut Vec<(String, String)>, exclude: &[&str]) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(io(dir))? {
        let entry = entry.map_err(io(dir))?;
        let name = entry.file_name();
        if dir == root && exclude.iter().any(|e| name == std::ffi::OsStr::new(e)) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_file_hashes(root, &path, out, exclude)?;
        } else {
            let bytes = fs::read(&path).map_err(io(&path))?;
            let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
            out.push((rel, hash::hash_bytes(&bytes)));
        }
    }
    Ok(())
}

fn count_entries(dir: &Path) -> Result<usize> {
    let mut count = 0;
    if !dir.exists() {
        return Ok(0);
    }
    for entry in fs::read_dir(dir).map_err(io(dir))? {
        let entry = entry.map_err(io(dir))?;
        let path = entry.path();
        if path.is_dir() {
            count += count_entries(&path)?;
        } else {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
#[path = "checkpoint_store_tests.rs"]
mod tests;
