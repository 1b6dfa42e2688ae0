// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory materialization of the event stream (spec.md §4.1).
//!
//! `MaterializedState` is the single writer-side source of truth for one
//! process; `FileStore` wraps it behind a mutex, appends each mutation to
//! the WAL before applying it in memory, and periodically snapshots it so
//! recovery doesn't have to replay from the beginning of time.

use crate::event::Event;
use cv_core::{
    Execution, ExecutionStatus, Insight, LockRecord, LogEntry, Pipeline, StageExecution,
    StageExecutionStatus,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub pipelines: IndexMap<String, Pipeline>,
    pub executions: IndexMap<String, Execution>,
    /// Keyed by `"{execution_id}:{stage_id}"`.
    pub stage_executions: IndexMap<String, StageExecution>,
    pub logs: HashMap<String, Vec<LogEntry>>,
    pub metrics: HashMap<String, Vec<(String, f64)>>,
    pub insights: Vec<Insight>,
    pub locks: HashMap<String, LockRecord>,
}

fn stage_key(execution_id: &str, stage_id: &str) -> String {
    format!("{execution_id}:{stage_id}")
}

impl MaterializedState {
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::PipelineCreated { pipeline } | Event::PipelineUpdated { pipeline } => {
                self.pipelines
                    .insert(pipeline.id.as_str().to_string(), pipeline.clone());
            }
            Event::PipelineDeleted { pipeline_id } => {
                self.pipelines.shift_remove(pipeline_id);
            }
            Event::ExecutionCreated { execution } => {
                self.executions
                    .insert(execution.id.as_str().to_string(), execution.clone());
            }
            Event::ExecutionStatusUpdated {
                execution_id,
                status,
                completed_stages,
                current_stage,
                error,
                now_ms,
            } => {
                if let Some(exec) = self.executions.get_mut(execution_id) {
                    apply_status_update(
                        exec,
                        *status,
                        completed_stages.as_deref(),
                        current_stage.as_deref(),
                        error.clone(),
                        *now_ms,
                    );
                }
            }
            Event::StageExecutionCreated { stage_execution } => {
                let key = stage_key(
                    stage_execution.execution_id.as_str(),
                    stage_execution.stage_id.as_str(),
                );
                self.stage_executions.insert(key, stage_execution.clone());
            }
            Event::StageExecutionUpdated {
                execution_id,
                stage_id,
                status,
                output,
                error,
                retry_count,
                started_at_ms,
                completed_at_ms,
                duration_ms,
            } => {
                let key = stage_key(execution_id, stage_id);
                if let Some(se) = self.stage_executions.get_mut(&key) {
                    se.status = *status;
                    if output.is_some() {
                        se.output = output.clone();
                    }
                    if error.is_some() {
                        se.error = error.clone();
                    }
                    if let Some(rc) = retry_count {
                        se.retry_count = *rc;
                    }
                    if let Some(ms) = started_at_ms {
                        se.started_at_ms = Some(*ms);
                    }
                    if let Some(ms) = completed_at_ms {
                        se.completed_at_ms = Some(*ms);
                    }
                    if let Some(ms) = duration_ms {
                        se.duration_ms = Some(*ms);
                    }
                }
            }
            Event::LogAppended {
                execution_id,
                entry,
            } => {
                self.logs
                    .entry(execution_id.clone())
                    .or_default()
                    .push(entry.clone());
            }
            Event::MetricRecorded {
                execution_id,
                name,
                value,
            } => {
                self.metrics
                    .entry(execution_id.clone())
                    .or_default()
                    .push((name.clone(), *value));
            }
            Event::InsightRecorded { insight } => {
                self.insights.push(insight.clone());
            }
            Event::LockAcquired { lock } => {
                self.locks.insert(lock.pipeline_id.as_str().to_string(), lock.clone());
            }
            Event::LockReleased { pipeline_id } => {
                self.locks.remove(pipeline_id);
            }
            Event::LocksReaped { pipeline_ids } => {
                for id in pipeline_ids {
                    self.locks.remove(id);
                }
            }
        }
    }
}

/// Applies a status-transition event to an execution, honoring the same
/// idempotent-terminal-state guarantee as `Execution::finish` (spec.md §8):
/// `completed_at_ms`/`duration_ms` are stamped only on the transition into a
/// terminal state, never on a reapplication of one.
fn apply_status_update(
    exec: &mut Execution,
    status: ExecutionStatus,
    completed_stages: Option<&[String]>,
    current_stage: Option<&str>,
    error: Option<String>,
    now_ms: u64,
) {
    let was_terminal = exec.status.is_terminal();
    if was_terminal && exec.status != status {
        return;
    }
    exec.status = status;
    if let Some(stages) = completed_stages {
        exec.completed_stages = stages.len();
    }
    exec.current_stage = current_stage.map(cv_core::StageId::new);
    if error.is_some() {
        exec.error = error;
    }
    if status.is_terminal() && !was_terminal {
        exec.completed_at_ms = Some(now_ms);
        exec.duration_ms = Some(now_ms.saturating_sub(exec.started_at_ms));
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
