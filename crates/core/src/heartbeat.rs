// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness record for a running execution (spec.md §3, §4.9).

use crate::id::ExecutionId;
use serde::{Deserialize, Serialize};

/// Last-seen timestamp for an execution's heartbeat, with a TTL equal to
/// 3x the heartbeat interval (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub execution_id: ExecutionId,
    pub last_seen_ms: u64,
    pub ttl_ms: u64,
}

impl Heartbeat {
    pub fn is_alive(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_seen_ms) < self.ttl_ms
    }
}
