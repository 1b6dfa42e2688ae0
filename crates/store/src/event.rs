// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The write-ahead event stream: everything `MaterializedState` can become
//! is reached by applying a sequence of these (spec.md §4.1 contracts).

use cv_core::{
    Execution, ExecutionStatus, Insight, LockRecord, LogEntry, Pipeline, StageExecution,
    StageExecutionStatus,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PipelineCreated {
        pipeline: Pipeline,
    },
    PipelineUpdated {
        pipeline: Pipeline,
    },
    PipelineDeleted {
        pipeline_id: String,
    },
    ExecutionCreated {
        execution: Execution,
    },
    ExecutionStatusUpdated {
        execution_id: String,
        status: ExecutionStatus,
        completed_stages: Option<Vec<String>>,
        current_stage: Option<String>,
        error: Option<String>,
        now_ms: u64,
    },
    StageExecutionCreated {
        stage_execution: StageExecution,
    },
    StageExecutionUpdated {
        execution_id: String,
        stage_id: String,
        status: StageExecutionStatus,
        output: Option<serde_json::Value>,
        error: Option<String>,
        retry_count: Option<u32>,
        started_at_ms: Option<u64>,
        completed_at_ms: Option<u64>,
        duration_ms: Option<u64>,
    },
    LogAppended {
        execution_id: String,
        entry: LogEntry,
    },
    MetricRecorded {
        execution_id: String,
        name: String,
        value: f64,
    },
    InsightRecorded {
        insight: Insight,
    },
    LockAcquired {
        lock: LockRecord,
    },
    LockReleased {
        pipeline_id: String,
    },
    LocksReaped {
        pipeline_ids: Vec<String>,
    },
}
