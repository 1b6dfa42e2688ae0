// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by the durable store (spec.md §4.1, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),
    #[error("execution not found: {0}")]
    ExecutionNotFound(String),
    #[error("stage execution not found: {exec_id}/{stage_id}")]
    StageExecutionNotFound { exec_id: String, stage_id: String },
    #[error("pipeline {0} already exists")]
    PipelineAlreadyExists(String),
    #[error("corrupt entry at offset {offset}: {message}")]
    Corrupt { offset: u64, message: String },
}

impl StoreError {
    /// Maps a store error onto the error-class taxonomy (spec.md §7): a
    /// missing row is the caller's bug, not a durability failure, so it
    /// stays `ExecutionFatal`/`Validation`-shaped rather than `StoreUnavailable`.
    pub fn class(&self) -> cv_core::ErrorClass {
        match self {
            StoreError::Io(_) | StoreError::Json(_) | StoreError::Corrupt { .. } => {
                cv_core::ErrorClass::StoreUnavailable
            }
            StoreError::PipelineNotFound(_)
            | StoreError::ExecutionNotFound(_)
            | StoreError::StageExecutionNotFound { .. }
            | StoreError::PipelineAlreadyExists(_) => cv_core::ErrorClass::Validation,
        }
    }
}
