// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Risk Scorer (spec.md §4.3): a pure function of aggregated pipeline
//! statistics, no clock dependency beyond "time since success", which is
//! precomputed by the caller into `ExecutionStats::days_since_last_success`.

use cv_core::ExecutionStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn is_blockable(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Band edges for [`RiskLevel`] (spec.md §4.3, configurable via
/// `EngineConfig`).
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl RiskThresholds {
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score < self.low {
            RiskLevel::Low
        } else if score < self.medium {
            RiskLevel::Medium
        } else if score < self.high {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// One weighted factor's contribution to the overall score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: &'static str,
    pub weight: f64,
    pub sub_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
    pub explanation: String,
}

/// Default stage-timeout scaled duration-anomaly cutoff (spec.md §4.3:
/// "avg > 0.8x default timeout").
const DURATION_ANOMALY_TIMEOUT_FRACTION: f64 = 0.8;

/// Pure risk-scoring function (spec.md §4.3). `default_timeout_secs` is
/// `EngineConfig::default_execution_timeout` expressed in seconds.
pub fn assess(stats: &ExecutionStats, thresholds: RiskThresholds, default_timeout_secs: f64) -> RiskAssessment {
    let historical = (stats.failure_rate() * 1.5).min(1.0);
    let recent = (stats.recent_failure_rate() * 2.0).min(1.0);
    let consecutive = (stats.consecutive_failures as f64 / 3.0).min(1.0);

    let duration = if stats.avg_duration_secs > default_timeout_secs * DURATION_ANOMALY_TIMEOUT_FRACTION {
        0.8
    } else if stats.avg_duration_secs > 120.0 {
        (stats.avg_duration_secs / 300.0).min(0.6)
    } else {
        0.0
    };

    let complexity = (stats.stage_count as f64 / 15.0).min(1.0);
    let since_success = (stats.days_since_last_success / 7.0).min(1.0);

    let factors = vec![
        RiskFactor {
            name: "historical_failure_rate",
            weight: 0.30,
            sub_score: historical,
        },
        RiskFactor {
            name: "recent_failures",
            weight: 0.25,
            sub_score: recent,
        },
        RiskFactor {
            name: "consecutive_failures",
            weight: 0.15,
            sub_score: consecutive,
        },
        RiskFactor {
            name: "duration_anomaly",
            weight: 0.10,
            sub_score: duration,
        },
        RiskFactor {
            name: "stage_complexity",
            weight: 0.10,
            sub_score: complexity,
        },
        RiskFactor {
            name: "time_since_success",
            weight: 0.10,
            sub_score: since_success,
        },
    ];

    let raw_score: f64 = factors.iter().map(|f| f.sub_score * f.weight).sum();
    let score = (raw_score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0;
    let level = thresholds.level_for(score);

    let mut recommendations = Vec::new();
    if historical > 0.3 {
        recommendations.push("Review pipeline configuration and add error handling".to_string());
    }
    if recent > 0.3 {
        recommendations.push("Monitor execution logs for recent failure patterns".to_string());
    }
    if duration > 0.0 {
        recommendations.push("Optimize stage processing or add parallel execution".to_string());
    }
    if complexity > 0.5 {
        recommendations.push("Consider splitting this pipeline into smaller stages".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("No action needed".to_string());
    }

    let explanation = format!(
        "risk={score:.3} ({level:?}): historical={historical:.2}, recent={recent:.2}, \
         consecutive={consecutive:.2}, duration={duration:.2}, complexity={complexity:.2}, \
         since_success={since_success:.2}",
    );

    RiskAssessment {
        score,
        level,
        factors,
        recommendations,
        explanation,
    }
}

#[cfg(test)]
#[path = "risk_tests.rs"]
mod tests;
