// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordination port (spec.md §4.2): soft duplicate-run prevention,
//! live execution/stage state, retry counters, heartbeats and a pipeline
//! cache — all with a TTL.

use crate::health::CoordinationHealth;
use async_trait::async_trait;
use cv_core::{ExecutionStatus, Pipeline, StageExecutionStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Live (non-authoritative) execution state cached by the coordination
/// port while an execution runs (spec.md §4.2 `set_execution_state`).
#[derive(Debug, Clone)]
pub struct ExecutionStateEntry {
    pub status: ExecutionStatus,
    pub metadata: HashMap<String, String>,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct StageStateEntry {
    pub status: StageExecutionStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[async_trait]
pub trait Coordination: Send + Sync {
    async fn try_prevent_duplicate(&self, pipeline_id: &str, ttl: Duration, now_ms: u64) -> bool;
    async fn release_pipeline(&self, pipeline_id: &str);

    async fn set_execution_state(
        &self,
        exec_id: &str,
        status: ExecutionStatus,
        metadata: HashMap<String, String>,
        ttl: Duration,
        now_ms: u64,
    );
    async fn get_execution_state(&self, exec_id: &str, now_ms: u64) -> Option<ExecutionStateEntry>;

    async fn set_stage_state(
        &self,
        exec_id: &str,
        stage_id: &str,
        status: StageExecutionStatus,
        output: Option<serde_json::Value>,
        error: Option<String>,
    );

    async fn increment_retry(&self, exec_id: &str, stage_id: &str) -> u32;
    async fn reset_retry(&self, exec_id: &str, stage_id: &str);

    async fn heartbeat(&self, exec_id: &str, ttl: Duration, now_ms: u64);
    async fn is_alive(&self, exec_id: &str, now_ms: u64) -> bool;

    async fn cache_pipeline(&self, id: &str, snapshot: Pipeline, ttl: Duration, now_ms: u64);
    async fn get_cached_pipeline(&self, id: &str, now_ms: u64) -> Option<Pipeline>;
    async fn invalidate(&self, id: &str);

    fn health(&self) -> CoordinationHealth;
}

struct Entry<T> {
    value: T,
    expires_at_ms: u64,
}

#[derive(Default)]
struct Inner {
    duplicate_locks: HashMap<String, Entry<()>>,
    execution_states: HashMap<String, ExecutionStateEntry>,
    stage_states: HashMap<(String, String), StageStateEntry>,
    retry_counts: HashMap<(String, String), u32>,
    heartbeats: HashMap<String, Entry<()>>,
    pipeline_cache: HashMap<String, Entry<Pipeline>>,
}

/// In-process `Coordination` backed by mutex-guarded maps. There is no
/// network hop to fail, so `health()` is `Healthy` unless fault injection
/// via [`set_health`](InProcessCoordination::set_health) is active — used
/// by tests to exercise the supervisor's degraded-mode fallback.
pub struct InProcessCoordination {
    inner: Mutex<Inner>,
    forced_health: Mutex<Option<CoordinationHealth>>,
}

impl Default for InProcessCoordination {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessCoordination {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            forced_health: Mutex::new(None),
        }
    }

    /// Test-only fault injection (SPEC_FULL.md §13 "Coordination port backing").
    pub fn set_health(&self, health: Option<CoordinationHealth>) {
        *self.forced_health.lock() = health;
    }
}

#[async_trait]
impl Coordination for InProcessCoordination {
    async fn try_prevent_duplicate(&self, pipeline_id: &str, ttl: Duration, now_ms: u64) -> bool {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.duplicate_locks.get(pipeline_id) {
            if existing.expires_at_ms > now_ms {
                return false;
            }
        }
        inner.duplicate_locks.insert(
            pipeline_id.to_string(),
            Entry {
                value: (),
                expires_at_ms: now_ms + ttl.as_millis() as u64,
            },
        );
        true
    }

    async fn release_pipeline(&self, pipeline_id: &str) {
        self.inner.lock().duplicate_locks.remove(pipeline_id);
    }

    async fn set_execution_state(
        &self,
        exec_id: &str,
        status: ExecutionStatus,
        metadata: HashMap<String, String>,
        ttl: Duration,
        now_ms: u64,
    ) {
        self.inner.lock().execution_states.insert(
            exec_id.to_string(),
            ExecutionStateEntry {
                status,
                metadata,
                expires_at_ms: now_ms + ttl.as_millis() as u64,
            },
        );
    }

    async fn get_execution_state(&self, exec_id: &str, now_ms: u64) -> Option<ExecutionStateEntry> {
        self.inner
            .lock()
            .execution_states
            .get(exec_id)
            .filter(|e| e.expires_at_ms > now_ms)
            .cloned()
    }

    async fn set_stage_state(
        &self,
        exec_id: &str,
        stage_id: &str,
        status: StageExecutionStatus,
        output: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        self.inner.lock().stage_states.insert(
            (exec_id.to_string(), stage_id.to_string()),
            StageStateEntry {
                status,
                output,
                error,
            },
        );
    }

    async fn increment_retry(&self, exec_id: &str, stage_id: &str) -> u32 {
        let mut inner = self.inner.lock();
        let counter = inner
            .retry_counts
            .entry((exec_id.to_string(), stage_id.to_string()))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    async fn reset_retry(&self, exec_id: &str, stage_id: &str) {
        self.inner
            .lock()
            .retry_counts
            .remove(&(exec_id.to_string(), stage_id.to_string()));
    }

    async fn heartbeat(&self, exec_id: &str, ttl: Duration, now_ms: u64) {
        self.inner.lock().heartbeats.insert(
            exec_id.to_string(),
            Entry {
                value: (),
                expires_at_ms: now_ms + ttl.as_millis() as u64,
            },
        );
    }

    async fn is_alive(&self, exec_id: &str, now_ms: u64) -> bool {
        self.inner
            .lock()
            .heartbeats
            .get(exec_id)
            .map(|e| e.expires_at_ms > now_ms)
            .unwrap_or(false)
    }

    async fn cache_pipeline(&self, id: &str, snapshot: Pipeline, ttl: Duration, now_ms: u64) {
        self.inner.lock().pipeline_cache.insert(
            id.to_string(),
            Entry {
                value: snapshot,
                expires_at_ms: now_ms + ttl.as_millis() as u64,
            },
        );
    }

    async fn get_cached_pipeline(&self, id: &str, now_ms: u64) -> Option<Pipeline> {
        self.inner
            .lock()
            .pipeline_cache
            .get(id)
            .filter(|e| e.expires_at_ms > now_ms)
            .map(|e| e.value.clone())
    }

    async fn invalidate(&self, id: &str) {
        self.inner.lock().pipeline_cache.remove(id);
    }

    fn health(&self) -> CoordinationHealth {
        self.forced_health
            .lock()
            .unwrap_or(CoordinationHealth::Healthy)
    }
}

#[cfg(test)]
#[path = "coordination_tests.rs"]
mod tests;
