// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response envelopes for the Trigger API (spec.md §4.10).

use cv_core::TriggerSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub pipeline_id: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub trigger_source: TriggerSource,
    #[serde(default)]
    pub trigger_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub execution_id: String,
}
