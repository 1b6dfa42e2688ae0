// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed configuration enumeration (spec.md §6 "Configuration").
//!
//! Every knob defaults; callers construct an `EngineConfig` and pass it
//! into the supervisor by value (constructor injection, per spec.md §9 —
//! no global/env-var reads inside engine crates).

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TTL for the duplicate-run set; also the soft cap per execution.
    pub default_execution_timeout: Duration,
    /// Used when a stage omits its own timeout.
    pub stage_default_timeout: Duration,
    pub executor_max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_backoff: f64,
    pub risk_threshold_low: f64,
    pub risk_threshold_medium: f64,
    pub risk_threshold_high: f64,
    pub block_high_risk: bool,
    pub anomaly_time_multiplier: f64,
    pub anomaly_error_threshold: u32,
    pub heartbeat_interval: Duration,
    pub heartbeat_ttl: Duration,
    pub lock_ttl: Duration,
    pub lock_retry_delay: Duration,
    pub lock_max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_secret: Option<String>,
    /// Bounded tail latency for cooperative cancellation (spec.md §5).
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_execution_timeout: Duration::from_secs(3600),
            stage_default_timeout: Duration::from_secs(300),
            executor_max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            retry_backoff: 2.0,
            risk_threshold_low: 0.2,
            risk_threshold_medium: 0.4,
            risk_threshold_high: 0.7,
            block_high_risk: false,
            anomaly_time_multiplier: 3.0,
            anomaly_error_threshold: 5,
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_ttl: Duration::from_secs(30),
            lock_ttl: Duration::from_secs(3600),
            lock_retry_delay: Duration::from_millis(200),
            lock_max_retries: 3,
            callback_secret: None,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// `heartbeat_ttl` must be at least 3x `heartbeat_interval` (spec.md §6).
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_ttl < self.heartbeat_interval * 3 {
            return Err(format!(
                "heartbeat_ttl ({:?}) must be >= 3x heartbeat_interval ({:?})",
                self.heartbeat_ttl, self.heartbeat_interval
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_internally_consistent() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_heartbeat_ttl_below_3x_interval() {
        let mut cfg = EngineConfig {
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_ttl: Duration::from_secs(20),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        cfg.heartbeat_ttl = Duration::from_secs(30);
        assert!(cfg.validate().is_ok());
    }
}
