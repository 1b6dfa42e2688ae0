// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI advisory insight records (spec.md §3; SPEC_FULL.md §12).
//!
//! Produced by the engine's safety layer, consumed only by external
//! viewers (dashboard, insight browsing API) — the engine itself never
//! reads an `Insight` back to make a decision.

use crate::id::InsightId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightScope {
    Pipeline,
    Execution,
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    RiskAssessment,
    AdmissionBlocked,
    Anomaly,
    Remediation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Advisory record produced by the engine (spec.md §3).
///
/// Carries human-readable `title`/`message`/`recommendation` text plus a
/// `factors` breakdown and `explanation`, matching the shape the original
/// system's prediction/anomaly modules produced (SPEC_FULL.md §12)
/// rather than just an opaque severity code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: InsightId,
    pub scope: InsightScope,
    pub kind: InsightKind,
    pub severity: InsightSeverity,
    pub title: String,
    pub message: String,
    pub recommendation: String,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub explanation: String,
    pub resolved: bool,
    pub created_at_ms: u64,
}
