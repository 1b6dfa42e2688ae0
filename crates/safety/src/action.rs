// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action Selector (spec.md §4.5): a pure function from the current
//! error/anomaly signal, stage criticality, and risk level to a
//! remediation action. Priority order is safest-first.

use crate::anomaly::AnomalySeverity;
use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    Continue,
    RetryStage,
    SkipStage,
    PauseExecution,
    Rollback,
    Terminate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationDecision {
    pub action: RemediationAction,
    pub rationale: String,
}

/// Describes the situation the selector is asked to arbitrate; `has_error`
/// distinguishes "stage failed" from "stage completed but flagged
/// anomalous", since only the former is eligible for retry/skip/pause.
#[derive(Debug, Clone, Copy)]
pub struct RemediationContext {
    pub has_error: bool,
    pub anomaly_severity: AnomalySeverity,
    pub is_critical: bool,
    pub retries_used: u32,
    pub max_retries: u32,
    pub risk_level: RiskLevel,
    pub recoverable: bool,
    pub unresolved_safety_violation: bool,
}

/// Pure remediation selection (spec.md §4.5 priority order, safest first).
pub fn select(ctx: RemediationContext) -> RemediationDecision {
    if !ctx.has_error && ctx.anomaly_severity == AnomalySeverity::None {
        return RemediationDecision {
            action: RemediationAction::Continue,
            rationale: "no issue detected".to_string(),
        };
    }

    let retries_remain = ctx.retries_used < ctx.max_retries;

    if ctx.recoverable && retries_remain {
        return RemediationDecision {
            action: RemediationAction::RetryStage,
            rationale: format!(
                "recoverable error, retry {}/{} remaining",
                ctx.retries_used + 1,
                ctx.max_retries
            ),
        };
    }

    if !ctx.is_critical && !retries_remain {
        return RemediationDecision {
            action: RemediationAction::SkipStage,
            rationale: "non-critical stage, retries exhausted".to_string(),
        };
    }

    let error_burst = matches!(
        ctx.anomaly_severity,
        AnomalySeverity::Medium | AnomalySeverity::High
    );
    if ctx.is_critical
        && matches!(ctx.risk_level, RiskLevel::High | RiskLevel::Critical)
        && error_burst
    {
        return RemediationDecision {
            action: RemediationAction::Rollback,
            rationale: "critical stage, high/critical risk, error burst detected".to_string(),
        };
    }

    if ctx.is_critical && !retries_remain {
        return RemediationDecision {
            action: RemediationAction::PauseExecution,
            rationale: "critical stage, retries exhausted".to_string(),
        };
    }

    if ctx.unresolved_safety_violation {
        return RemediationDecision {
            action: RemediationAction::Terminate,
            rationale: "unresolved safety violation".to_string(),
        };
    }

    // Fell through every case above: treat as a hard failure rather than
    // silently continuing.
    RemediationDecision {
        action: RemediationAction::Terminate,
        rationale: "no matching remediation rule; terminating defensively".to_string(),
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
