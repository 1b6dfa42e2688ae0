// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat Loop and liveness reaper (spec.md §4.9).

use cv_coordination::Coordination;
use cv_core::{Clock, ExecutionStatus};
use cv_store::{ExecutionStatusUpdate, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-execution companion task: calls `Coordination::heartbeat` every
/// `interval` until the execution terminates or shutdown is signaled.
pub struct HeartbeatLoop {
    handle: tokio::task::JoinHandle<()>,
}

impl HeartbeatLoop {
    pub fn spawn<C: Clock>(
        coordination: Arc<dyn Coordination>,
        execution_id: String,
        interval: Duration,
        ttl: Duration,
        clock: C,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                coordination
                    .heartbeat(&execution_id, ttl, clock.epoch_ms())
                    .await;
                tokio::time::sleep(interval).await;
            }
        });
        Self { handle }
    }

    /// Ends the loop (spec.md §4.9: "ends when its execution terminates").
    pub fn stop(self) {
        self.handle.abort();
    }
}

/// Background task (spec.md §4.9): periodically lists running executions,
/// checks liveness via C2, and fails any execution whose heartbeat has
/// gone stale, releasing its pipeline lock.
pub struct Reaper {
    handle: tokio::task::JoinHandle<()>,
}

impl Reaper {
    pub fn spawn<C: Clock>(
        store: Arc<dyn Store>,
        coordination: Arc<dyn Coordination>,
        interval: Duration,
        clock: C,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(interval).await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                Self::sweep(&store, &coordination, &clock).await;
            }
        });
        Self { handle }
    }

    async fn sweep<C: Clock>(store: &Arc<dyn Store>, coordination: &Arc<dyn Coordination>, clock: &C) {
        let running = match store.list_executions_by_status(ExecutionStatus::Running).await {
            Ok(executions) => executions,
            Err(e) => {
                tracing::error!(error = %e, "reaper: could not list running executions");
                return;
            }
        };
        let now_ms = clock.epoch_ms();
        for execution in running {
            let exec_id = execution.id.as_str();
            if coordination.is_alive(exec_id, now_ms).await {
                continue;
            }
            tracing::warn!(exec_id, "liveness lost, failing execution");
            if let Err(e) = store
                .update_execution_status(
                    exec_id,
                    ExecutionStatus::Failed,
                    ExecutionStatusUpdate {
                        completed_stages: None,
                        current_stage: None,
                        error: Some("liveness lost".to_string()),
                    },
                    now_ms,
                )
                .await
            {
                tracing::error!(exec_id, error = %e, "reaper: failed to mark execution failed");
            }
            if let Err(e) = store.release_lock(&execution.pipeline_id).await {
                tracing::error!(exec_id, error = %e, "reaper: failed to release pipeline lock");
            }
        }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
