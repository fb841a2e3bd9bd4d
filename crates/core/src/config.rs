// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic TOML loading for the per-crate `Config` structs
//! (`CheckpointStoreConfig`, `RegressionConfig`, `SafetyConfig`,
//! `WorkflowConfig`, `RemoteConfig`). Each of those is a plain
//! `serde(default)`-annotated struct with its own `Default` impl; this
//! module only owns turning a TOML document on disk into one of them.
//! Reading the file is the embedder's job — these crates never reach for a
//! config path themselves.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parse a TOML document already in memory into a config struct, falling
/// back to `Default` for any field the document omits.
pub fn from_toml_str<T: DeserializeOwned>(text: &str) -> Result<T, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Read `path` and parse it as a TOML config struct.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&text)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
