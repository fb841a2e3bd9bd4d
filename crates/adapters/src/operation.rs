// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operation requests, one variant per recognized `(componentType,
//! operation)` pair.

use serde_json::Value;

#[derive(Debug, Clone)]
pub enum ArchiveUpdate {
    RunIds(Vec<String>),
    Mapping(Value),
}

#[derive(Debug, Clone)]
pub enum DgmOperation {
    AdvanceGeneration(Value),
    UpdateArchive(ArchiveUpdate),
}

#[derive(Debug, Clone, Default)]
pub struct EvolveRequest {
    pub initial_program_path: Option<String>,
    pub evaluation_file: Option<String>,
    pub output_dir: Option<String>,
    pub config_path: Option<String>,
    pub iterations: Option<u32>,
    pub target_score: Option<f64>,
    pub checkpoint: Option<String>,
    /// Present when this is a remote job submission wrapping `{job: {...}}`
    /// rather than a local evolve call.
    pub job: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum OpenEvolveOperation {
    Evolve(EvolveRequest),
}

#[derive(Debug, Clone)]
pub enum SealOperation {
    SubmitPrompt(String),
    AnalyzeCode(String),
}

/// One request to `ComponentAdapter::execute`, tagged by component type.
#[derive(Debug, Clone)]
pub enum Operation {
    Dgm(DgmOperation),
    OpenEvolve(OpenEvolveOperation),
    Seal(SealOperation),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Dgm(DgmOperation::AdvanceGeneration(_)) => "advance_generation",
            Operation::Dgm(DgmOperation::UpdateArchive(_)) => "update_archive",
            Operation::OpenEvolve(OpenEvolveOperation::Evolve(_)) => "evolve",
            Operation::Seal(SealOperation::SubmitPrompt(_)) => "submit_prompt",
            Operation::Seal(SealOperation::AnalyzeCode(_)) => "analyze_code",
        }
    }

    pub fn component_type(&self) -> evoseal_core::ComponentType {
        use evoseal_core::ComponentType;
        match self {
            Operation::Dgm(_) => ComponentType::Dgm,
            Operation::OpenEvolve(_) => ComponentType::Openevolve,
            Operation::Seal(_) => ComponentType::Seal,
        }
    }
}
