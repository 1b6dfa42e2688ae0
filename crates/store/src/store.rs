// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable store port (spec.md §4.1) and its file-backed implementation.

use crate::event::Event;
use crate::snapshot::Snapshot;
use crate::state::MaterializedState;
use crate::wal::Wal;
use crate::StoreError;
use async_trait::async_trait;
use cv_core::{
    Execution, ExecutionStats, ExecutionStatus, Insight, LockHolderId, LockRecord, LogEntry,
    LogLevel, Pipeline, PipelineId, StageExecution, StageExecutionStatus,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional fields on an execution-status update (spec.md §4.1).
#[derive(Debug, Clone, Default)]
pub struct ExecutionStatusUpdate {
    pub completed_stages: Option<Vec<String>>,
    pub current_stage: Option<String>,
    pub error: Option<String>,
}

/// Optional fields on a stage-execution update.
#[derive(Debug, Clone, Default)]
pub struct StageExecutionUpdate {
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub retry_count: Option<u32>,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

/// Durable Store port (spec.md §4.1): persists pipelines, executions,
/// stage executions, logs, insights, metrics and locks.
///
/// `update_execution_status` is serializable per execution id and terminal
/// transitions are idempotent; both guarantees come for free here because
/// every implementation serializes all writes behind a single mutex and
/// `MaterializedState::apply` no-ops on a repeated terminal transition.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_pipeline(&self, pipeline: Pipeline) -> Result<(), StoreError>;
    async fn get_pipeline(&self, id: &PipelineId) -> Result<Option<Pipeline>, StoreError>;
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError>;
    async fn update_pipeline(&self, pipeline: Pipeline) -> Result<(), StoreError>;
    async fn delete_pipeline(&self, id: &PipelineId) -> Result<(), StoreError>;

    async fn create_execution(&self, execution: Execution) -> Result<(), StoreError>;
    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError>;
    async fn list_executions_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<Execution>, StoreError>;
    /// `now_ms` is stamped as `completed_at_ms` (with `duration_ms` derived
    /// from the execution's `started_at_ms`) on the transition into a
    /// terminal status; ignored otherwise.
    async fn update_execution_status(
        &self,
        id: &str,
        status: ExecutionStatus,
        update: ExecutionStatusUpdate,
        now_ms: u64,
    ) -> Result<(), StoreError>;

    async fn create_stage_execution(&self, stage_execution: StageExecution) -> Result<(), StoreError>;
    async fn get_stage_execution(
        &self,
        execution_id: &str,
        stage_id: &str,
    ) -> Result<Option<StageExecution>, StoreError>;
    async fn update_stage_execution(
        &self,
        execution_id: &str,
        stage_id: &str,
        status: StageExecutionStatus,
        update: StageExecutionUpdate,
    ) -> Result<(), StoreError>;

    async fn append_log(&self, entry: LogEntry) -> Result<(), StoreError>;
    async fn get_logs(
        &self,
        execution_id: &str,
        level: Option<LogLevel>,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, StoreError>;

    async fn record_metric(&self, execution_id: &str, name: &str, value: f64) -> Result<(), StoreError>;

    async fn record_insight(&self, insight: Insight) -> Result<(), StoreError>;

    /// Aggregate statistics for a pipeline over a rolling window, the
    /// input to the risk scorer (spec.md §4.3).
    async fn get_execution_stats(
        &self,
        pipeline_id: &PipelineId,
        window_days: u32,
    ) -> Result<ExecutionStats, StoreError>;

    async fn try_acquire_lock(
        &self,
        pipeline_id: &PipelineId,
        holder: &LockHolderId,
        ttl: Duration,
        now_ms: u64,
    ) -> Result<bool, StoreError>;
    async fn release_lock(&self, pipeline_id: &PipelineId) -> Result<(), StoreError>;
    /// Releases every lock past its TTL; returns the pipeline ids reaped.
    async fn reap_expired_locks(&self, now_ms: u64) -> Result<Vec<String>, StoreError>;
}

/// File-backed `Store`: WAL + periodic snapshot, mirroring the teacher's
/// event-log-plus-materialized-view storage layer.
pub struct FileStore {
    inner: Mutex<Inner>,
    snapshot_path: PathBuf,
    /// Snapshot after this many WAL appends since the last one.
    checkpoint_interval: u64,
}

struct Inner {
    wal: Wal,
    state: MaterializedState,
    last_snapshot_seq: u64,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`, recovering from the last
    /// snapshot plus WAL replay if either exists.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let wal_path = dir.join("wal.jsonl");
        let snapshot_path = dir.join("snapshot.json");

        let (mut state, last_snapshot_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snap) => (snap.state, snap.seq),
            None => (MaterializedState::default(), 0),
        };

        let wal = Wal::open(&wal_path)?;
        for entry in wal.entries_after(last_snapshot_seq)? {
            state.apply(&entry.event);
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                wal,
                state,
                last_snapshot_seq,
            }),
            snapshot_path,
            checkpoint_interval: 500,
        })
    }

    fn apply(&self, event: Event) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.append(&event)?;
        inner.state.apply(&event);
        if seq.saturating_sub(inner.last_snapshot_seq) >= self.checkpoint_interval {
            let snapshot = Snapshot::new(seq, inner.state.clone());
            snapshot.save(&self.snapshot_path)?;
            inner.wal.truncate_before(seq)?;
            inner.last_snapshot_seq = seq;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn create_pipeline(&self, pipeline: Pipeline) -> Result<(), StoreError> {
        {
            let inner = self.inner.lock();
            if inner.state.pipelines.contains_key(pipeline.id.as_str()) {
                return Err(StoreError::PipelineAlreadyExists(pipeline.id.to_string()));
            }
        }
        self.apply(Event::PipelineCreated { pipeline })
    }

    async fn get_pipeline(&self, id: &PipelineId) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.inner.lock().state.pipelines.get(id.as_str()).cloned())
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError> {
        Ok(self.inner.lock().state.pipelines.values().cloned().collect())
    }

    async fn update_pipeline(&self, pipeline: Pipeline) -> Result<(), StoreError> {
        {
            let inner = self.inner.lock();
            if !inner.state.pipelines.contains_key(pipeline.id.as_str()) {
                return Err(StoreError::PipelineNotFound(pipeline.id.to_string()));
            }
        }
        self.apply(Event::PipelineUpdated { pipeline })
    }

    async fn delete_pipeline(&self, id: &PipelineId) -> Result<(), StoreError> {
        self.apply(Event::PipelineDeleted {
            pipeline_id: id.to_string(),
        })
    }

    async fn create_execution(&self, execution: Execution) -> Result<(), StoreError> {
        self.apply(Event::ExecutionCreated { execution })
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        Ok(self.inner.lock().state.executions.get(id).cloned())
    }

    async fn list_executions_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<Execution>, StoreError> {
        Ok(self
            .inner
            .lock()
            .state
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
        {
            let inner = self.inner.lock();
            if !inner.state.executions.contains_key(id) {
                return Err(StoreError::ExecutionNotFound(id.to_string()));
            }
        }
        self.apply(Event::ExecutionStatusUpdated {
            execution_id: id.to_string(),
            status,
            completed_stages: update.completed_stages,
            current_stage: update.current_stage,
            error: update.error,
            now_ms,
        })
    }

    async fn create_stage_execution(&self, stage_execution: StageExecution) -> Result<(), StoreError> {
        self.apply(Event::StageExecutionCreated { stage_execution })
    }

    async fn get_stage_execution(
        &self,
        execution_id: &str,
        stage_id: &str,
    ) -> Result<Option<StageExecution>, StoreError> {
        let key = format!("{execution_id}:{stage_id}");
        Ok(self.inner.lock().state.stage_executions.get(&key).cloned())
    }

    async fn update_stage_execution(
        &self,
        execution_id: &str,
        stage_id: &str,
        status: StageExecutionStatus,
        update: StageExecutionUpdate,
    ) -> Result<(), StoreError> {
        {
            let key = format!("{execution_id}:{stage_id}");
            let inner = self.inner.lock();
            if !inner.state.stage_executions.contains_key(&key) {
                return Err(StoreError::StageExecutionNotFound {
                    exec_id: execution_id.to_string(),
                    stage_id: stage_id.to_string(),
                });
            }
        }
        self.apply(Event::StageExecutionUpdated {
            execution_id: execution_id.to_string(),
            stage_id: stage_id.to_string(),
            status,
            output: update.output,
            error: update.error,
            retry_count: update.retry_count,
            started_at_ms: update.started_at_ms,
            completed_at_ms: update.completed_at_ms,
            duration_ms: update.duration_ms,
        })
    }

    async fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.apply(Event::LogAppended {
            execution_id: entry.execution_id.to_string(),
            entry,
        })
    }

    async fn get_logs(
        &self,
        execution_id: &str,
        level: Option<LogLevel>,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let inner = self.inner.lock();
        let mut entries: Vec<LogEntry> = inner
            .state
            .logs
            .get(execution_id)
            .cloned()
            .unwrap_or_default();
        if let Some(level) = level {
            entries.retain(|e| e.level == level);
        }
        if let Some(limit) = limit {
            let start = entries.len().saturating_sub(limit);
            entries = entries.split_off(start);
        }
        Ok(entries)
    }

    async fn record_metric(&self, execution_id: &str, name: &str, value: f64) -> Result<(), StoreError> {
        self.apply(Event::MetricRecorded {
            execution_id: execution_id.to_string(),
            name: name.to_string(),
            value,
        })
    }

    async fn record_insight(&self, insight: Insight) -> Result<(), StoreError> {
        self.apply(Event::InsightRecorded { insight })
    }

    async fn get_execution_stats(
        &self,
        pipeline_id: &PipelineId,
        window_days: u32,
    ) -> Result<ExecutionStats, StoreError> {
        let inner = self.inner.lock();
        crate::stats_from_state::compute(&inner.state, pipeline_id, window_days)
    }

    async fn try_acquire_lock(
        &self,
        pipeline_id: &PipelineId,
        holder: &LockHolderId,
        ttl: Duration,
        now_ms: u64,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.state.locks.get(pipeline_id.as_str()) {
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
        inner.wal.append(&Event::LockAcquired { lock: lock.clone() })?;
        inner.state.apply(&Event::LockAcquired { lock });
        Ok(true)
    }

    async fn release_lock(&self, pipeline_id: &PipelineId) -> Result<(), StoreError> {
        self.apply(Event::LockReleased {
            pipeline_id: pipeline_id.to_string(),
        })
    }

    async fn reap_expired_locks(&self, now_ms: u64) -> Result<Vec<String>, StoreError> {
        let expired: Vec<String> = {
            let inner = self.inner.lock();
            inner
                .state
                .locks
                .values()
                .filter(|l| l.is_expired(now_ms))
                .map(|l| l.pipeline_id.to_string())
                .collect()
        };
        if expired.is_empty() {
            return Ok(expired);
        }
        self.apply(Event::LocksReaped {
            pipeline_ids: expired.clone(),
        })?;
        Ok(expired)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
