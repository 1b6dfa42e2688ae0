// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline definition: an immutable-by-version DAG of stages.

use crate::id::{PipelineId, StageId};
use crate::stage::StageDef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An immutable-by-version pipeline definition (spec.md §3).
///
/// A `Pipeline` is never mutated once created; updating a pipeline means
/// creating a new version. In-flight executions keep the definitional
/// snapshot they started with (spec.md §9), so `Pipeline` is cheap to
/// clone and has no back-references to its executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    pub version: u32,
    pub description: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub stages: Vec<StageDef>,
}

/// Errors detected while validating a pipeline definition (spec.md §4.6).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PipelineValidationError {
    #[error("pipeline has no stages")]
    Empty,
    #[error("duplicate stage id: {0}")]
    DuplicateStageId(String),
    #[error("stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency { stage: String, dependency: String },
}

impl Pipeline {
    /// Look up a stage definition by id.
    pub fn stage(&self, id: &StageId) -> Option<&StageDef> {
        self.stages.iter().find(|s| &s.id == id)
    }

    /// Validate the structural invariants from spec.md §3/§4.6:
    /// non-empty, unique stage ids, dependencies reference real stages.
    ///
    /// Cycle detection is a separate concern, owned by `cv-planner`, since
    /// it requires the same DFS the planner uses to produce the execution
    /// order (spec.md §4.6 step 2).
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::Empty);
        }

        let mut seen = HashSet::with_capacity(self.stages.len());
        for stage in &self.stages {
            if !seen.insert(stage.id.as_str()) {
                return Err(PipelineValidationError::DuplicateStageId(
                    stage.id.to_string(),
                ));
            }
        }

        for stage in &self.stages {
            for dep in &stage.dependencies {
                if !seen.contains(dep.as_str()) {
                    return Err(PipelineValidationError::UnknownDependency {
                        stage: stage.id.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
