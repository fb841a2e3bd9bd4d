// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for remote-mode adapters. Abstracted behind a trait so
//! adapter logic can be exercised in tests without a real HTTP server,
//! favoring a fake trait implementation over a request-mocking crate.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// Configuration for one remote adapter endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_token: None,
            request_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// The submit → poll → fetch job-polling transport, and the single-request
/// `post` used by the SEAL adapter and DGM's `update_archive`.
#[async_trait]
pub trait JobTransport: Send + Sync {
    async fn post(&self, path: &str, body: Value) -> Result<Value, AdapterError>;
    async fn get(&self, path: &str) -> Result<Value, AdapterError>;
}

/// Real transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl ReqwestTransport {
    pub fn new(config: RemoteConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl JobTransport for ReqwestTransport {
    async fn post(&self, path: &str, body: Value) -> Result<Value, AdapterError> {
        let request = self.authorize(self.client.post(self.url(path)).json(&body));
        let response = request.send().await.map_err(|e| AdapterError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AdapterError::Transport(format!("HTTP {}", response.status())));
        }
        response.json().await.map_err(|e| AdapterError::Protocol(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Value, AdapterError> {
        let request = self.authorize(self.client.get(self.url(path)));
        let response = request.send().await.map_err(|e| AdapterError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AdapterError::Transport(format!("HTTP {}", response.status())));
        }
        response.json().await.map_err(|e| AdapterError::Protocol(e.to_string()))
    }
}

/// Run the submit → poll → fetch sequence common to DGM and OpenEvolve
/// remote operations. `request_timeout` bounds the entire sequence, not
/// any single HTTP call within it — a job stuck `running` past the
/// deadline is a retryable timeout, same as a single slow request.
pub async fn run_job(
    transport: &dyn JobTransport,
    submit_path: &str,
    body: Value,
    status_path: impl Fn(&str) -> String,
    result_path: impl Fn(&str) -> String,
    poll_interval: Duration,
    request_timeout: Duration,
) -> Result<Value, AdapterError> {
    tokio::time::timeout(request_timeout, run_job_inner(transport, submit_path, body, status_path, result_path, poll_interval))
        .await
        .unwrap_or(Err(AdapterError::Timeout(request_timeout)))
}

async fn run_job_inner(
    transport: &dyn JobTransport,
    submit_path: &str,
    body: Value,
    status_path: impl Fn(&str) -> String,
    result_path: impl Fn(&str) -> String,
    poll_interval: Duration,
) -> Result<Value, AdapterError> {
    let submission = transport.post(submit_path, body).await?;
    let job_id = submission
        .get("jobId")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::Protocol("response missing jobId".to_string()))?
        .to_string();

    loop {
        let status_response = transport.get(&status_path(&job_id)).await?;
        let status = parse_status(&status_response)?;
        match status {
            JobStatus::Completed => break,
            JobStatus::Failed => return Err(AdapterError::JobFailed(job_id)),
            JobStatus::Running => tokio::time::sleep(poll_interval).await,
        }
    }

    transport.get(&result_path(&job_id)).await
}

fn parse_status(response: &Value) -> Result<JobStatus, AdapterError> {
    match response.get("status").and_then(Value::as_str) {
        Some("completed") => Ok(JobStatus::Completed),
        Some("failed") => Ok(JobStatus::Failed),
        Some("running") => Ok(JobStatus::Running),
        other => Err(AdapterError::Protocol(format!("unexpected status {other:?}"))),
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Canned-response transport for adapter tests. Each call to `post`/`get`
    /// pops the next scripted response for that path; missing scripts panic
    /// so a test can't silently pass on an unexercised call.
    #[derive(Default)]
    pub struct FakeTransport {
        responses: Mutex<std::collections::HashMap<String, VecDeque<Result<Value, String>>>>,
        pub requests: Mutex<Vec<(String, Value)>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(&self, path: impl Into<String>, response: Value) -> &Self {
            self.responses
                .lock()
                .entry(path.into())
                .or_default()
                .push_back(Ok(response));
            self
        }

        pub fn script_error(&self, path: impl Into<String>, error: impl Into<String>) -> &Self {
            self.responses
                .lock()
                .entry(path.into())
                .or_default()
                .push_back(Err(error.into()));
            self
        }

        fn respond(&self, path: &str) -> Result<Value, AdapterError> {
            let mut responses = self.responses.lock();
            let queue = responses
                .get_mut(path)
                .unwrap_or_else(|| panic!("FakeTransport: no scripted response for {path}"));
            let next = queue
                .pop_front()
                .unwrap_or_else(|| panic!("FakeTransport: scripted responses for {path} exhausted"));
            next.map_err(AdapterError::Transport)
        }
    }

    #[async_trait]
    impl JobTransport for FakeTransport {
        async fn post(&self, path: &str, body: Value) -> Result<Value, AdapterError> {
            self.requests.lock().push((path.to_string(), body));
            self.respond(path)
        }

        async fn get(&self, path: &str) -> Result<Value, AdapterError> {
            self.requests.lock().push((path.to_string(), Value::Null));
            self.respond(path)
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "reqwest_transport_tests.rs"]
mod reqwest_tests;
