// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger API failure modes, mapped to the status codes in spec.md
//! §4.10's table (this crate never frames them onto HTTP itself).

use cv_engine::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("blocked by risk assessment: {0:?}")]
    Blocked(cv_safety::RiskLevel),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The status code a caller framing this onto HTTP (or any other
    /// transport) should use.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Blocked(_) => 422,
            ApiError::Internal(_) => 500,
        }
    }

    pub(crate) fn from_supervisor(err: SupervisorError) -> Self {
        match err {
            SupervisorError::UnknownPipeline(id) => ApiError::NotFound(id),
            SupervisorError::NotFound(id) => ApiError::NotFound(id),
            SupervisorError::Duplicate(id) => ApiError::Conflict(format!("already running: {id}")),
            SupervisorError::AlreadyTerminal(id) => ApiError::Conflict(format!("already terminal: {id}")),
            SupervisorError::NotRunning(id) => ApiError::Conflict(format!("not running: {id}")),
            SupervisorError::NotPaused(id) => ApiError::Conflict(format!("not paused: {id}")),
            SupervisorError::Blocked(level) => ApiError::Blocked(level),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<cv_store::StoreError> for ApiError {
    fn from(err: cv_store::StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
