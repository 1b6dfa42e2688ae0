// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage definitions: the closed set of handler kinds a pipeline can use.

use crate::id::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The closed set of built-in stage handler kinds (spec.md §4.7).
///
/// Treated as a tagged sum type at the definition boundary; the runner
/// resolves a `StageKind` to a handler through a registry keyed by name
/// (see `cv-engine::handlers`), so new kinds can be registered without
/// touching this enum's consumers — but the four below are the only ones
/// a pipeline definition can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Input,
    Transform,
    Validation,
    Output,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Input => "input",
            StageKind::Transform => "transform",
            StageKind::Validation => "validation",
            StageKind::Output => "output",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retry policy for a single stage (spec.md §3 Stage definition).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (1-indexed retry number), capped by
    /// `cap`. `attempt` is the retry count, i.e. 1 for the first retry
    /// after the initial attempt.
    pub fn delay_for_attempt(&self, attempt: u32, cap: Duration) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let multiplier = self.backoff_factor.powi((attempt - 1) as i32);
        let millis = (self.base_delay.as_secs_f64() * multiplier * 1000.0).max(0.0);
        let delay = Duration::from_millis(millis as u64);
        delay.min(cap)
    }
}

/// Definition of a single stage within a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDef {
    pub id: StageId,
    pub name: String,
    pub kind: StageKind,
    /// Opaque per-kind configuration (spec.md §9: closed set of
    /// well-known keys per kind, represented as a free-form map here and
    /// interpreted by the matching handler).
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub dependencies: Vec<StageId>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    #[serde(default)]
    pub is_critical: bool,
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
