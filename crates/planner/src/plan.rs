// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG Planner (spec.md §4.6): validates a pipeline and emits a
//! deterministic execution order.

use crate::error::PlanError;
use cv_core::{Pipeline, StageDef, StageId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub order: Vec<StageId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate `pipeline` and produce its deterministic execution order
/// (spec.md §4.6):
/// 1. structural validation (empty/duplicate/unknown-dependency) — owned
///    by `Pipeline::validate`;
/// 2. cycle detection via DFS with recursion-stack coloring;
/// 3. topological order via Kahn's algorithm, ties broken by original
///    stage index so runs are reproducible.
pub fn plan(pipeline: &Pipeline) -> Result<ExecutionPlan, PlanError> {
    pipeline.validate()?;
    detect_cycle(pipeline)?;
    Ok(ExecutionPlan {
        order: topological_order(pipeline),
    })
}

fn detect_cycle(pipeline: &Pipeline) -> Result<(), PlanError> {
    let stages: HashMap<&str, &StageDef> = pipeline
        .stages
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();
    let mut marks: HashMap<&str, Mark> = stages.keys().map(|id| (*id, Mark::Unvisited)).collect();

    for &id in stages.keys() {
        if marks[id] == Mark::Unvisited {
            visit(&stages, id, &mut marks)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    stages: &HashMap<&'a str, &'a StageDef>,
    id: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<(), PlanError> {
    marks.insert(id, Mark::InProgress);
    // `id` always comes from `stages`'s own keys, so the lookup can't miss.
    if let Some(stage) = stages.get(id) {
        for dep in &stage.dependencies {
            match marks.get(dep.as_str()) {
                Some(Mark::InProgress) => return Err(PlanError::Cycle(dep.to_string())),
                Some(Mark::Done) => {}
                _ => visit(stages, dep.as_str(), marks)?,
            }
        }
    }
    marks.insert(id, Mark::Done);
    Ok(())
}

/// Kahn's algorithm, processing the ready queue in original stage-index
/// order at every step so ties are broken reproducibly.
fn topological_order(pipeline: &Pipeline) -> Vec<StageId> {
    let index_of: HashMap<&str, usize> = pipeline
        .stages
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut in_degree: HashMap<&str, usize> = pipeline
        .stages
        .iter()
        .map(|s| (s.id.as_str(), 0))
        .collect();
    for stage in &pipeline.stages {
        if let Some(degree) = in_degree.get_mut(stage.id.as_str()) {
            *degree += stage.dependencies.len();
        }
    }

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for stage in &pipeline.stages {
        for dep in &stage.dependencies {
            dependents.entry(dep.as_str()).or_default().push(stage.id.as_str());
        }
    }

    let mut ready: Vec<&str> = pipeline
        .stages
        .iter()
        .filter(|s| in_degree[s.id.as_str()] == 0)
        .map(|s| s.id.as_str())
        .collect();
    ready.sort_by_key(|id| index_of[id]);

    let mut order = Vec::with_capacity(pipeline.stages.len());
    while !ready.is_empty() {
        ready.sort_by_key(|id| index_of[id]);
        let current = ready.remove(0);
        order.push(StageId::new(current));

        if let Some(deps) = dependents.get(current) {
            for &dependent in deps {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }
    }

    order
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
