// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote (HTTP) adapters for DGM and OpenEvolve, and the SEAL adapter,
//! which is always remote. DGM/OpenEvolve evolution calls
//! go through the submit → poll → result job protocol; DGM's
//! `update_archive` and both SEAL operations are a single request/response.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use evoseal_core::{ComponentResult, ComponentState, ComponentStatus, ComponentType};
use serde_json::{json, Value};

use crate::adapter::{timed, ComponentAdapter, StatusTracker};
use crate::error::AdapterError;
use crate::operation::{ArchiveUpdate, DgmOperation, OpenEvolveOperation, Operation, SealOperation};
use crate::transport::{run_job, JobTransport, RemoteConfig};

pub struct RemoteAdapter {
    component_type: ComponentType,
    transport: Arc<dyn JobTransport>,
    config: RemoteConfig,
    status: StatusTracker,
}

impl RemoteAdapter {
    pub fn new(component_type: ComponentType, transport: Arc<dyn JobTransport>, config: RemoteConfig) -> Self {
        Self {
            component_type,
            transport,
            config,
            status: StatusTracker::new(),
        }
    }

    async fn dispatch(&self, operation: &Operation) -> Result<Value, AdapterError> {
        match operation {
            Operation::Dgm(DgmOperation::AdvanceGeneration(payload)) => {
                run_job(
                    self.transport.as_ref(),
                    "/dgm/jobs/advance",
                    payload.clone(),
                    |id| format!("/dgm/jobs/{id}/status"),
                    |id| format!("/dgm/jobs/{id}/result"),
                    self.config.poll_interval,
                    self.config.request_timeout,
                )
                .await
            }
            Operation::Dgm(DgmOperation::UpdateArchive(update)) => {
                let body = match update {
                    ArchiveUpdate::RunIds(ids) => json!(ids),
                    ArchiveUpdate::Mapping(value) => value.clone(),
                };
                self.transport.post("/dgm/archive/update", body).await
            }
            Operation::OpenEvolve(OpenEvolveOperation::Evolve(req)) => {
                let body = req.job.clone().unwrap_or_else(|| {
                    json!({
                        "initialProgramPath": req.initial_program_path,
                        "evaluationFile": req.evaluation_file,
                        "outputDir": req.output_dir,
                        "configPath": req.config_path,
                        "iterations": req.iterations,
                        "targetScore": req.target_score,
                        "checkpoint": req.checkpoint,
                    })
                });
                run_job(
                    self.transport.as_ref(),
                    "/openevolve/jobs/evolve",
                    body,
                    |id| format!("/openevolve/jobs/{id}/status"),
                    |id| format!("/openevolve/jobs/{id}/result"),
                    self.config.poll_interval,
                    self.config.request_timeout,
                )
                .await
            }
            Operation::Seal(SealOperation::SubmitPrompt(prompt)) => {
                self.transport.post("/seal/submit_prompt", json!({"prompt": prompt})).await
            }
            Operation::Seal(SealOperation::AnalyzeCode(code)) => {
                self.transport.post("/seal/analyze_code", json!({"code": code})).await
            }
        }
    }
}

#[async_trait]
impl ComponentAdapter for RemoteAdapter {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    async fn initialize(&self) -> bool {
        if self.config.base_url.is_empty() {
            self.status.set_failed("missing base_url for remote adapter");
            return false;
        }
        self.status.transition(ComponentState::Initializing, "initializing") && self.status.transition(ComponentState::Ready, "ready")
    }

    async fn start(&self) -> bool {
        self.status.transition(ComponentState::Starting, "starting") && self.status.transition(ComponentState::Running, "running")
    }

    async fn stop(&self) -> bool {
        self.status.transition(ComponentState::Stopping, "stopping") && self.status.transition(ComponentState::Stopped, "stopped")
    }

    async fn execute(&self, operation: Operation) -> ComponentResult {
        let start = Instant::now();
        if operation.component_type() != self.component_type {
            return ComponentResult::unknown_operation(operation.name(), timed(start));
        }
        if !self.status.is_ready_or_running() {
            return ComponentResult::err("component not ready", timed(start));
        }
        match self.dispatch(&operation).await {
            Ok(data) => ComponentResult::ok(data, timed(start)),
            Err(err) => ComponentResult::err(err.to_string(), timed(start)),
        }
    }

    async fn get_metrics(&self) -> serde_json::Map<String, Value> {
        Default::default()
    }

    async fn get_status(&self) -> ComponentStatus {
        self.status.snapshot()
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
