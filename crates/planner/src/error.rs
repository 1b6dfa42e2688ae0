// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planning failures (spec.md §4.6).

use cv_core::PipelineValidationError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] PipelineValidationError),
    #[error("cycle detected involving stage {0}")]
    Cycle(String),
}
