// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage Runner (spec.md §4.7): executes one stage with timeout, retries
//! with exponential backoff, and result capture.

use crate::error::RunnerError;
use crate::handlers::{HandlerRegistry, StageContext};
use cv_coordination::Coordination;
use cv_core::{Clock, Execution, ExecutionId, LogEntry, LogLevel, StageDef, StageExecutionStatus, StageId};
use cv_store::{Store, StageExecutionUpdate};
use std::sync::Arc;

/// Executes a single stage to completion or exhaustion (spec.md §4.7).
///
/// Owns no execution-level state: `ExecutionSupervisor` calls `run` once
/// per stage and interprets the `Result` per its own state machine.
pub struct StageRunner<C: Clock> {
    store: Arc<dyn Store>,
    coordination: Arc<dyn Coordination>,
    handlers: HandlerRegistry,
    clock: C,
}

impl<C: Clock> StageRunner<C> {
    pub fn new(
        store: Arc<dyn Store>,
        coordination: Arc<dyn Coordination>,
        handlers: HandlerRegistry,
        clock: C,
    ) -> Self {
        Self {
            store,
            coordination,
            handlers,
            clock,
        }
    }

    /// Runs `stage` within `execution`'s context (variables + the first
    /// dependency's result), retrying per the stage's `RetryPolicy`.
    pub async fn run(&self, execution: &Execution, stage: &StageDef) -> Result<serde_json::Value, RunnerError> {
        let exec_id = execution.id.as_str();
        let stage_id = stage.id.as_str();

        let handler = self
            .handlers
            .get(stage.kind.as_str())
            .ok_or_else(|| RunnerError::UnknownKind(stage.kind.as_str().to_string()))?;

        let input = stage
            .dependencies
            .first()
            .and_then(|dep| execution.results.get(dep.as_str()))
            .cloned();
        let ctx = StageContext {
            variables: execution.variables.clone(),
            input,
        };

        let span = tracing::info_span!("stage", exec_id, stage_id, kind = %stage.kind);
        let _guard = span.enter();

        let mut last_error = String::new();

        for attempt in 0..=stage.retry.max_retries {
            if attempt > 0 {
                let delay = stage.retry.delay_for_attempt(attempt, stage.timeout);
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "retry backoff");
                tokio::time::sleep(delay).await;
            }

            let started_ms = self.clock.epoch_ms();
            self.coordination
                .set_stage_state(exec_id, stage_id, StageExecutionStatus::Running, None, None)
                .await;
            self.store
                .update_stage_execution(
                    exec_id,
                    stage_id,
                    StageExecutionStatus::Running,
                    StageExecutionUpdate {
                        retry_count: Some(attempt),
                        started_at_ms: Some(started_ms),
                        ..Default::default()
                    },
                )
                .await?;

            let outcome = tokio::time::timeout(stage.timeout, handler.run(stage, &ctx)).await;
            let completed_ms = self.clock.epoch_ms();
            let duration_ms = completed_ms.saturating_sub(started_ms);

            match outcome {
                Ok(Ok(output)) => {
                    self.coordination
                        .set_stage_state(
                            exec_id,
                            stage_id,
                            StageExecutionStatus::Completed,
                            Some(output.clone()),
                            None,
                        )
                        .await;
                    self.store
                        .update_stage_execution(
                            exec_id,
                            stage_id,
                            StageExecutionStatus::Completed,
                            StageExecutionUpdate {
                                output: Some(output.clone()),
                                completed_at_ms: Some(completed_ms),
                                duration_ms: Some(duration_ms),
                                ..Default::default()
                            },
                        )
                        .await?;
                    self.coordination.reset_retry(exec_id, stage_id).await;
                    self.store
                        .record_metric(exec_id, &format!("stage.{stage_id}.duration_ms"), duration_ms as f64)
                        .await?;

                    // Log result_keys rather than the full payload, matching
                    // the original system's log-shrinking convention
                    // (SPEC_FULL.md §12).
                    let result_keys: Vec<String> = output
                        .as_object()
                        .map(|m| m.keys().cloned().collect())
                        .unwrap_or_default();
                    self.store
                        .append_log(
                            LogEntry::new(
                                ExecutionId::new(exec_id),
                                LogLevel::Info,
                                format!("stage {stage_id} completed"),
                                completed_ms,
                            )
                            .with_stage(StageId::new(stage_id))
                            .with_metadata("result_keys", serde_json::json!(result_keys)),
                        )
                        .await?;

                    tracing::info!(attempt, duration_ms, "stage completed");
                    return Ok(output);
                }
                Ok(Err(err)) => {
                    last_error = err.to_string();
                }
                Err(_elapsed) => {
                    last_error = format!("stage timed out after {:?}", stage.timeout);
                }
            }

            tracing::warn!(attempt, error = %last_error, "stage attempt failed");
            self.store
                .append_log(
                    LogEntry::new(
                        ExecutionId::new(exec_id),
                        LogLevel::Error,
                        format!("stage {stage_id} failed: {last_error}"),
                        completed_ms,
                    )
                    .with_stage(StageId::new(stage_id)),
                )
                .await?;
            self.coordination
                .set_stage_state(
                    exec_id,
                    stage_id,
                    StageExecutionStatus::Failed,
                    None,
                    Some(last_error.clone()),
                )
                .await;
            self.store
                .update_stage_execution(
                    exec_id,
                    stage_id,
                    StageExecutionStatus::Failed,
                    StageExecutionUpdate {
                        error: Some(last_error.clone()),
                        retry_count: Some(attempt),
                        completed_at_ms: Some(completed_ms),
                        duration_ms: Some(duration_ms),
                        ..Default::default()
                    },
                )
                .await?;
            self.coordination.increment_retry(exec_id, stage_id).await;
        }

        Err(RunnerError::Exhausted(last_error))
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
