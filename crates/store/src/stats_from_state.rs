// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared aggregation behind `Store::get_execution_stats` (spec.md §4.3),
//! factored out so both `FileStore` and `InMemoryStore` compute it the
//! same way despite holding their state behind different lock types.

use crate::state::MaterializedState;
use crate::StoreError;
use cv_core::{Execution, ExecutionStats, ExecutionStatus, PipelineId};

pub fn compute(
    state: &MaterializedState,
    pipeline_id: &PipelineId,
    window_days: u32,
) -> Result<ExecutionStats, StoreError> {
    let window_ms = (window_days as u64) * 24 * 3600 * 1000;
    let now_ms = state
        .executions
        .values()
        .map(|e| e.started_at_ms)
        .max()
        .unwrap_or(0);

    let runs: Vec<&Execution> = state
        .executions
        .values()
        .filter(|e| &e.pipeline_id == pipeline_id)
        .collect();

    let total_executions = runs.len() as u64;
    let failed_executions = runs
        .iter()
        .filter(|e| e.status == ExecutionStatus::Failed)
        .count() as u64;

    let recent: Vec<&&Execution> = runs
        .iter()
        .filter(|e| now_ms.saturating_sub(e.started_at_ms) <= window_ms)
        .collect();
    let executions_last_7_days = recent.len() as u64;
    let failures_last_7_days = recent
        .iter()
        .filter(|e| e.status == ExecutionStatus::Failed)
        .count() as u64;

    let durations: Vec<u64> = runs.iter().filter_map(|e| e.duration_ms).collect();
    let avg_duration_secs = if durations.is_empty() {
        0.0
    } else {
        (durations.iter().sum::<u64>() as f64 / durations.len() as f64) / 1000.0
    };

    let mut sorted_by_time: Vec<&&Execution> = runs.iter().collect();
    sorted_by_time.sort_by_key(|e| e.started_at_ms);
    let mut consecutive_failures = 0u64;
    for exec in sorted_by_time.iter().rev() {
        if exec.status == ExecutionStatus::Failed {
            consecutive_failures += 1;
        } else if exec.status.is_terminal() {
            break;
        }
    }

    let last_success_ms = sorted_by_time
        .iter()
        .rev()
        .find(|e| e.status == ExecutionStatus::Completed)
        .map(|e| e.completed_at_ms.unwrap_or(e.started_at_ms));
    let days_since_last_success = match last_success_ms {
        Some(ts) => (now_ms.saturating_sub(ts) as f64) / (24.0 * 3600.0 * 1000.0),
        None => f64::MAX,
    };

    let stage_count = state
        .pipelines
        .get(pipeline_id.as_str())
        .map(|p| p.stages.len())
        .unwrap_or(0);

    Ok(ExecutionStats {
        total_executions,
        failed_executions,
        avg_duration_secs,
        failures_last_7_days,
        executions_last_7_days,
        consecutive_failures,
        days_since_last_success,
        stage_count,
    })
}
