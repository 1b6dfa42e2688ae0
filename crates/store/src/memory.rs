// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `Store` for tests: same semantics as `FileStore` minus the
//! WAL and snapshot, so other crates' tests don't need a temp directory.

use crate::state::MaterializedState;
use crate::store::{ExecutionStatusUpdate, Store, StageExecutionUpdate};
use crate::event::Event;
use crate::StoreError;
use async_trait::async_trait;
use cv_core::{
    Execution, ExecutionStats, ExecutionStatus, Insight, LockHolderId, LockRecord, LogEntry,
    LogLevel, Pipeline, PipelineId, StageExecution, StageExecutionStatus,
};
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MaterializedState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_pipeline(&self, pipeline: Pipeline) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.pipelines.contains_key(pipeline.id.as_str()) {
            return Err(StoreError::PipelineAlreadyExists(pipeline.id.to_string()));
        }
        state.apply(&Event::PipelineCreated { pipeline });
        Ok(())
    }

    async fn get_pipeline(&self, id: &PipelineId) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.state.lock().pipelines.get(id.as_str()).cloned())
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError> {
        Ok(self.state.lock().pipelines.values().cloned().collect())
    }

    async fn update_pipeline(&self, pipeline: Pipeline) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.pipelines.contains_key(pipeline.id.as_str()) {
            return Err(StoreError::PipelineNotFound(pipeline.id.to_string()));
        }
        state.apply(&Event::PipelineUpdated { pipeline });
        Ok(())
    }

    async fn delete_pipeline(&self, id: &PipelineId) -> Result<(), StoreError> {
        self.state.lock().apply(&Event::PipelineDeleted {
            pipeline_id: id.to_string(),
        });
        Ok(())
    }

    async fn create_execution(&self, execution: Execution) -> Result<(), StoreError> {
        self.state.lock().apply(&Event::ExecutionCreated { execution });
        Ok(())
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        Ok(self.state.lock().executions.get(id).cloned())
    }

    async fn list_executions_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<Execution>, StoreError> {
        Ok(self
            .state
            .lock()
            .executions
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect())
    }

    async fn update_execution_status(
        &self,
        id: &str,
        status: ExecutionStatus,
        update: ExecutionStatusUpdate,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.executions.contains_key(id) {
            return Err(StoreError::ExecutionNotFound(id.to_string()));
        }
        state.apply(&Event::ExecutionStatusUpdated {
            execution_id: id.to_string(),
            status,
            completed_stages: update.completed_stages,
            current_stage: update.current_stage,
            error: update.error,
            now_ms,
        });
        Ok(())
    }

    async fn create_stage_execution(&self, stage_execution: StageExecution) -> Result<(), StoreError> {
        self.state
            .lock()
            .apply(&Event::StageExecutionCreated { stage_execution });
        Ok(())
    }

    async fn get_stage_execution(
        &self,
        execution_id: &str,
        stage_id: &str,
    ) -> Result<Option<StageExecution>, StoreError> {
        let key = format!("{execution_id}:{stage_id}");
        Ok(self.state.lock().stage_executions.get(&key).cloned())
    }

    async fn update_stage_execution(
        &self,
        execution_id: &str,
        stage_id: &str,
        status: StageExecutionStatus,
        update: StageExecutionUpdate,
    ) -> Result<(), StoreError> {
        let key = format!("{execution_id}:{stage_id}");
        let mut state = self.state.lock();
        if !state.stage_executions.contains_key(&key) {
            return Err(StoreError::StageExecutionNotFound {
                exec_id: execution_id.to_string(),
                stage_id: stage_id.to_string(),
            });
        }
        state.apply(&Event::StageExecutionUpdated {
            execution_id: execution_id.to_string(),
            stage_id: stage_id.to_string(),
            status,
            output: update.output,
            error: update.error,
            retry_count: update.retry_count,
            started_at_ms: update.started_at_ms,
            completed_at_ms: update.completed_at_ms,
            duration_ms: update.duration_ms,
        });
        Ok(())
    }

    async fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.state.lock().apply(&Event::LogAppended {
            execution_id: entry.execution_id.to_string(),
            entry,
        });
        Ok(())
    }

    async fn get_logs(
        &self,
        execution_id: &str,
        level: Option<LogLevel>,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let state = self.state.lock();
        let mut entries = state.logs.get(execution_id).cloned().unwrap_or_default();
        if let Some(level) = level {
            entries.retain(|e: &LogEntry| e.level == level);
        }
        if let Some(limit) = limit {
            let start = entries.len().saturating_sub(limit);
            entries = entries.split_off(start);
        }
        Ok(entries)
    }

    async fn record_metric(&self, execution_id: &str, name: &str, value: f64) -> Result<(), StoreError> {
        self.state.lock().apply(&Event::MetricRecorded {
            execution_id: execution_id.to_string(),
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    async fn record_insight(&self, insight: Insight) -> Result<(), StoreError> {
        self.state.lock().apply(&Event::InsightRecorded { insight });
        Ok(())
    }

    async fn get_execution_stats(
        &self,
        pipeline_id: &PipelineId,
        window_days: u32,
    ) -> Result<ExecutionStats, StoreError> {
        // Delegates to the same aggregation `FileStore` uses, duplicated
        // here rather than shared because the two stores hold their state
        // behind different lock types.
        let state = self.state.lock();
        crate::stats_from_state::compute(&state, pipeline_id, window_days)
    }

    async fn try_acquire_lock(
        &self,
        pipeline_id: &PipelineId,
        holder: &LockHolderId,
        ttl: Duration,
        now_ms: u64,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.locks.get(pipeline_id.as_str()) {
            if !existing.is_expired(now_ms) {
                return Ok(false);
            }
        }
        let lock = LockRecord {
            pipeline_id: pipeline_id.clone(),
            holder: holder.clone(),
            acquired_at_ms: now_ms,
            expires_at_ms: now_ms + ttl.as_millis() as u64,
        };
        state.apply(&Event::LockAcquired { lock });
        Ok(true)
    }

    async fn release_lock(&self, pipeline_id: &PipelineId) -> Result<(), StoreError> {
        self.state.lock().apply(&Event::LockReleased {
            pipeline_id: pipeline_id.to_string(),
        });
        Ok(())
    }

    async fn reap_expired_locks(&self, now_ms: u64) -> Result<Vec<String>, StoreError> {
        let expired: Vec<String> = {
            let state = self.state.lock();
            state
                .locks
                .values()
                .filter(|l| l.is_expired(now_ms))
                .map(|l| l.pipeline_id.to_string())
                .collect()
        };
        if !expired.is_empty() {
            self.state.lock().apply(&Event::LocksReaped {
                pipeline_ids: expired.clone(),
            });
        }
        Ok(expired)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
