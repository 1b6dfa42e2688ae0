// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-execution log entries (spec.md §3).

use crate::id::{ExecutionId, StageId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single log line attached to an execution (and optionally a stage).
///
/// `metadata` carries arbitrary structured context (e.g. a truncated
/// stack trace on stage failure, or `result_keys` on stage success — see
/// SPEC_FULL.md §12), mirroring the original system's
/// `add_log(..., metadata={...})` pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub execution_id: ExecutionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<StageId>,
    pub level: LogLevel,
    pub message: String,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LogEntry {
    pub fn new(execution_id: ExecutionId, level: LogLevel, message: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            execution_id,
            stage_id: None,
            level,
            message: message.into(),
            timestamp_ms,
            metadata: HashMap::new(),
        }
    }

    pub fn with_stage(mut self, stage_id: StageId) -> Self {
        self.stage_id = Some(stage_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
