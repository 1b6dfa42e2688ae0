// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Trigger API (spec.md §4.10): a narrow, in-process request/reply
//! surface over the Execution Supervisor. Deliberately not an HTTP
//! server — framing onto routes is out of scope (spec.md §1).

mod error;
mod requests;

pub use error::ApiError;
pub use requests::{StartRequest, StartResponse};

use cv_core::{Clock, IdGen, LogEntry, LogLevel, SystemClock, UuidIdGen};
use cv_engine::{ExecutionSupervisor, SupervisorError};
use cv_store::Store;
use std::sync::Arc;

/// One request-reply method per operation in spec.md §4.10's table.
pub struct TriggerApi<C: Clock = SystemClock, G: IdGen = UuidIdGen> {
    supervisor: ExecutionSupervisor<C, G>,
    store: Arc<dyn Store>,
}

impl<C: Clock, G: IdGen> TriggerApi<C, G> {
    pub fn new(supervisor: ExecutionSupervisor<C, G>, store: Arc<dyn Store>) -> Self {
        Self { supervisor, store }
    }

    /// 202 with execution id; 404 unknown pipeline; 409 duplicate; 422
    /// blocked by risk.
    pub async fn start(&self, req: StartRequest) -> Result<StartResponse, ApiError> {
        let execution_id = self
            .supervisor
            .start(&req.pipeline_id, req.variables, req.trigger_source, req.trigger_metadata)
            .await
            .map_err(ApiError::from_supervisor)?;
        Ok(StartResponse {
            execution_id: execution_id.as_str().to_string(),
        })
    }

    /// 200 with execution snapshot; 404.
    pub async fn status(&self, execution_id: &str) -> Result<cv_core::Execution, ApiError> {
        self.store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(execution_id.to_string()))
    }

    /// 200 with log slice; 404.
    pub async fn logs(
        &self,
        execution_id: &str,
        level: Option<LogLevel>,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>, ApiError> {
        if self.store.get_execution(execution_id).await?.is_none() {
            return Err(ApiError::NotFound(execution_id.to_string()));
        }
        Ok(self.store.get_logs(execution_id, level, limit).await?)
    }

    /// 200; 404; 409 if already terminal.
    pub async fn stop(&self, execution_id: &str) -> Result<(), ApiError> {
        self.supervisor.cancel(execution_id).await.map_err(ApiError::from_supervisor)
    }

    /// 200; 404; 409 unless running.
    pub async fn pause(&self, execution_id: &str) -> Result<(), ApiError> {
        self.supervisor.pause(execution_id).await.map_err(ApiError::from_supervisor)
    }

    /// 200; 404; 409 unless paused.
    pub async fn resume(&self, execution_id: &str) -> Result<(), ApiError> {
        self.supervisor.resume(execution_id).await.map_err(ApiError::from_supervisor)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
