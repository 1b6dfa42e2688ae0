// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classes shared across crates (spec.md §7).

use serde::{Deserialize, Serialize};

/// The error-class taxonomy from spec.md §7, used to decide disposition
/// (retry locally, surface to operator, etc.) independent of which crate
/// raised the underlying error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Admission,
    StageTransient,
    StageFatal,
    ExecutionFatal,
    LivenessLoss,
    CoordinationDegraded,
    StoreUnavailable,
}

impl ErrorClass {
    /// Stage-transient and coordination-degraded are the only classes the
    /// supervisor recovers from locally (spec.md §7); everything else is
    /// surfaced to the operator.
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorClass::StageTransient | ErrorClass::CoordinationDegraded
        )
    }
}
