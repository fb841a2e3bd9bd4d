// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration orchestrator: a registry of one adapter per `ComponentType`,
//! fanning `initialize`/`start`/`stop` out across them concurrently and
//! dispatching `execute` calls to a specific adapter or a fixed
//! three-stage evolution workflow. The registry is a
//! `parking_lot::Mutex<HashMap<..>>`, with fan-out done over owned `Arc`
//! clones via `futures::future::join_all` so no lock is held across an
//! `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use evoseal_adapters::{ComponentAdapter, Operation};
use evoseal_core::{ComponentResult, ComponentStatus, ComponentType, Event, EventBus, EventKind};
use parking_lot::Mutex;
use serde_json::{Map, Value};

/// One stage of `execute_evolution_workflow`'s fixed three-stage sequence.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: &'static str,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EvolutionWorkflowResult {
    pub success: bool,
    pub stages: Vec<StageOutcome>,
}

/// Input to `execute_evolution_workflow`: the
/// payloads for the fixed DGM-advance -> OpenEvolve-evolve -> DGM-archive
/// sequence.
#[derive(Debug, Clone, Default)]
pub struct EvolutionWorkflowConfig {
    pub advance_payload: Value,
    pub evolve_request: evoseal_adapters::EvolveRequest,
    pub archive_update: Option<evoseal_adapters::ArchiveUpdate>,
}

/// Registry of adapters, one per `ComponentType`, and the aggregate
/// operations the workflow coordinator drives through it.
pub struct Orchestrator {
    adapters: Mutex<HashMap<ComponentType, Arc<dyn ComponentAdapter>>>,
    event_bus: EventBus,
}

impl Orchestrator {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            adapters: Mutex::new(HashMap::new()),
            event_bus,
        }
    }

    pub fn register(&self, adapter: Arc<dyn ComponentAdapter>) {
        self.adapters.lock().insert(adapter.component_type(), adapter);
    }

    fn snapshot(&self) -> Vec<Arc<dyn ComponentAdapter>> {
        self.adapters.lock().values().cloned().collect()
    }

    fn get(&self, component_type: ComponentType) -> Option<Arc<dyn ComponentAdapter>> {
        self.adapters.lock().get(&component_type).cloned()
    }

    /// Call `initialize()` on every registered adapter concurrently.
    /// Returns `true` iff all succeed.
    pub async fn initialize(&self) -> bool {
        let adapters = self.snapshot();
        let results = futures::future::join_all(adapters.iter().map(|a| {
            let a = a.clone();
            async move { (a.component_type(), a.initialize().await) }
        }))
        .await;

        let mut all_ok = true;
        for (component_type, ok) in results {
            all_ok &= ok;
            let kind = if ok { EventKind::ComponentInitialized } else { EventKind::ComponentFailed };
            self.event_bus
                .publish(Event::component(kind, "orchestrator", component_type.to_string(), component_type.to_string(), "initialize"))
                .await;
        }
        all_ok
    }

    pub async fn start(&self) -> bool {
        let adapters = self.snapshot();
        let results = futures::future::join_all(adapters.iter().map(|a| {
            let a = a.clone();
            async move { (a.component_type(), a.start().await) }
        }))
        .await;

        let mut all_ok = true;
        for (component_type, ok) in results {
            all_ok &= ok;
            let kind = if ok { EventKind::ComponentStarted } else { EventKind::ComponentFailed };
            self.event_bus
                .publish(Event::component(kind, "orchestrator", component_type.to_string(), component_type.to_string(), "start"))
                .await;
        }
        all_ok
    }

    pub async fn stop(&self) -> bool {
        let adapters = self.snapshot();
        let results = futures::future::join_all(adapters.iter().map(|a| {
            let a = a.clone();
            async move { (a.component_type(), a.stop().await) }
        }))
        .await;

        let mut all_ok = true;
        for (component_type, ok) in results {
            all_ok &= ok;
            self.event_bus
                .publish(Event::component(EventKind::ComponentStopped, "orchestrator", component_type.to_string(), component_type.to_string(), "stop"))
                .await;
        }
        all_ok
    }

    pub async fn get_all_status(&self) -> HashMap<ComponentType, ComponentStatus> {
        let adapters = self.snapshot();
        let results = futures::future::join_all(adapters.iter().map(|a| {
            let a = a.clone();
            async move { (a.component_type(), a.get_status().await) }
        }))
        .await;
        results.into_iter().collect()
    }

    pub async fn get_all_metrics(&self) -> HashMap<ComponentType, Map<String, Value>> {
        let adapters = self.snapshot();
        let results = futures::future::join_all(adapters.iter().map(|a| {
            let a = a.clone();
            async move { (a.component_type(), a.get_metrics().await) }
        }))
        .await;
        results.into_iter().collect()
    }

    /// Dispatch one operation to the adapter registered for its component
    /// type. A missing adapter is reported the same way an adapter itself
    /// reports an unknown operation: `success=false`.
    pub async fn execute_component_operation(&self, operation: Operation) -> ComponentResult {
        match self.get(operation.component_type()) {
            Some(adapter) => adapter.execute(operation).await,
            None => ComponentResult::err("component not available", std::time::Duration::ZERO),
        }
    }

    /// Fan out a batch of operations concurrently, preserving the input
    /// order in the result vector. One operation's failure never cancels
    /// its siblings.
    pub async fn execute_parallel_operations(&self, operations: Vec<Operation>) -> Vec<ComponentResult> {
        futures::future::join_all(operations.into_iter().map(|op| self.execute_component_operation(op))).await
    }

    /// Run the fixed DGM `advance_generation` -> OpenEvolve `evolve` -> DGM
    /// `update_archive` sequence. Each stage is
    /// attempted in order; a missing component skips its stage with
    /// `success=false, error="component not available"` rather than
    /// aborting the remaining stages.
    pub async fn execute_evolution_workflow(&self, cfg: EvolutionWorkflowConfig) -> EvolutionWorkflowResult {
        let mut stages = Vec::with_capacity(3);

        let advance = self
            .execute_component_operation(Operation::Dgm(evoseal_adapters::DgmOperation::AdvanceGeneration(cfg.advance_payload)))
            .await;
        stages.push(StageOutcome {
            stage: "dgm_generation",
            success: advance.success,
            data: advance.data,
            error: advance.error,
        });

        let evolve = self
            .execute_component_operation(Operation::OpenEvolve(evoseal_adapters::OpenEvolveOperation::Evolve(cfg.evolve_request)))
            .await;
        stages.push(StageOutcome {
            stage: "openevolve_evolution",
            success: evolve.success,
            data: evolve.data,
            error: evolve.error,
        });

        let archive_update = cfg.archive_update.unwrap_or(evoseal_adapters::ArchiveUpdate::RunIds(Vec::new()));
        let archive = self
            .execute_component_operation(Operation::Dgm(evoseal_adapters::DgmOperation::UpdateArchive(archive_update)))
            .await;
        stages.push(StageOutcome {
            stage: "dgm_archive_update",
            success: archive.success,
            data: archive.data,
            error: archive.error,
        });

        let success = stages.iter().all(|s| s.success);
        EvolutionWorkflowResult { success, stages }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
