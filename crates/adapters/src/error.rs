// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter-internal error type. Per the contract adapters
//! never let these escape `execute` — they're folded into
//! `ComponentResult{success:false, error}` at the call boundary — but the
//! transport layer still needs a typed error to distinguish retriable
//! failures from protocol violations.

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("remote job failed: {0}")]
    JobFailed(String),
}

impl AdapterError {
    /// True for failures the coordinator should retry with backoff, false
    /// for ones it should surface after a small, bounded number of attempts.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AdapterError::Transport(_) | AdapterError::Timeout(_))
    }
}
