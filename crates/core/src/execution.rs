// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution and stage-execution state machines (spec.md §3, §4.8).

use crate::id::{ExecutionId, PipelineId, StageId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status of one run of a pipeline.
///
/// Terminal states (`Completed`, `Failed`, `Cancelled`, `RolledBack`) are
/// absorbing: once reached, no further transition is valid. See
/// `Execution::can_transition_to` for the guarded state machine from
/// spec.md §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    RolledBack,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
                | ExecutionStatus::RolledBack
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::RolledBack => "rolled_back",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single stage within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Who or what triggered an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Schedule,
    External,
    Retry,
}

/// The record of one stage's run within one execution (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageExecution {
    pub execution_id: ExecutionId,
    pub stage_id: StageId,
    pub status: StageExecutionStatus,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub is_anomaly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_reason: Option<String>,
}

impl StageExecution {
    pub fn pending(execution_id: ExecutionId, stage_id: StageId) -> Self {
        Self {
            execution_id,
            stage_id,
            status: StageExecutionStatus::Pending,
            started_at_ms: None,
            completed_at_ms: None,
            duration_ms: None,
            retry_count: 0,
            output: None,
            error: None,
            is_anomaly: false,
            anomaly_reason: None,
        }
    }
}

/// One run of a pipeline (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub pipeline_id: PipelineId,
    pub pipeline_name: String,
    pub status: ExecutionStatus,
    pub total_stages: usize,
    pub completed_stages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageId>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    pub trigger_source: TriggerSource,
    #[serde(default)]
    pub trigger_metadata: HashMap<String, String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub results: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Execution {
    pub fn new(
        id: ExecutionId,
        pipeline_id: PipelineId,
        pipeline_name: String,
        total_stages: usize,
        trigger_source: TriggerSource,
        trigger_metadata: HashMap<String, String>,
        variables: HashMap<String, String>,
        risk_score: Option<f64>,
        started_at_ms: u64,
    ) -> Self {
        Self {
            id,
            pipeline_id,
            pipeline_name,
            status: ExecutionStatus::Pending,
            total_stages,
            completed_stages: 0,
            current_stage: None,
            started_at_ms,
            completed_at_ms: None,
            duration_ms: None,
            risk_score,
            trigger_source,
            trigger_metadata,
            variables,
            results: HashMap::new(),
            error: None,
        }
    }

    /// Whether `to` is a legal transition from the current status, per the
    /// state machine diagram in spec.md §4.8. Terminal states are
    /// absorbing: no transition out of them is legal, but re-applying the
    /// same terminal state is a documented idempotent no-op (spec.md §8),
    /// handled by the caller rather than rejected here.
    pub fn can_transition_to(&self, to: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        if self.status == to {
            return true; // idempotent re-application of a terminal state
        }
        match (self.status, to) {
            (Pending, Running) => true,
            (Pending, Failed) | (Pending, Cancelled) => true, // admission rejection paths
            (Running, Paused) => true,
            (Running, Completed | Failed | Cancelled | RolledBack) => true,
            (Paused, Running) => true,
            (Paused, Cancelled | Failed) => true,
            _ => false,
        }
    }

    /// Apply a terminal transition, setting `completed_at_ms` and
    /// `duration_ms` per the invariant in spec.md §3. Idempotent: calling
    /// this again with the same terminal status is a no-op (spec.md §8).
    pub fn finish(&mut self, status: ExecutionStatus, now_ms: u64, error: Option<String>) {
        debug_assert!(status.is_terminal());
        if self.status.is_terminal() {
            return; // terminal states are absorbing; re-application is a no-op
        }
        self.status = status;
        self.completed_at_ms = Some(now_ms);
        self.duration_ms = Some(now_ms.saturating_sub(self.started_at_ms));
        self.current_stage = None;
        if error.is_some() {
            self.error = error;
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
