// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the engine crate (spec.md §7 error classes).

use thiserror::Error;

/// Raised by a `StageHandler` implementation (spec.md §4.7 step 5).
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
}

/// Raised by `StageRunner::run` (spec.md §4.7).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no handler registered for stage kind {0}")]
    UnknownKind(String),
    #[error("stage exhausted retries: {0}")]
    Exhausted(String),
    #[error("store error: {0}")]
    Store(#[from] cv_store::StoreError),
}

/// Raised by `ExecutionSupervisor` (aggregates the ports it owns, the way
/// the teacher's `ExecuteError` aggregates its adapters).
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("unknown pipeline: {0}")]
    UnknownPipeline(String),
    #[error("execution blocked by risk assessment: {0:?}")]
    Blocked(cv_safety::RiskLevel),
    #[error("duplicate execution already running for pipeline {0}")]
    Duplicate(String),
    #[error("execution not found: {0}")]
    NotFound(String),
    #[error("execution {0} is already terminal")]
    AlreadyTerminal(String),
    #[error("execution {0} is not running")]
    NotRunning(String),
    #[error("execution {0} is not paused")]
    NotPaused(String),
    #[error("pipeline validation failed: {0}")]
    Plan(#[from] cv_planner::PlanError),
    #[error("store error: {0}")]
    Store(#[from] cv_store::StoreError),
    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),
    #[error("could not acquire pipeline lock for {0} after retrying")]
    LockUnavailable(String),
}
