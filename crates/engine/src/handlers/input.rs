// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in `input` stage handler (spec.md §4.7 step 3).

use super::{StageContext, StageHandler};
use crate::error::HandlerError;
use async_trait::async_trait;
use cv_core::StageDef;
use serde_json::json;

/// Draws its records straight from the stage configuration — there is no
/// external source in the closed handler set, only what the pipeline
/// author put in `config.records`.
pub struct InputHandler;

#[async_trait]
impl StageHandler for InputHandler {
    async fn run(&self, stage: &StageDef, _ctx: &StageContext) -> Result<serde_json::Value, HandlerError> {
        let source = stage
            .config
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let records = stage
            .config
            .get("records")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let count = records.len();
        Ok(json!({ "source": source, "records": records, "count": count }))
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
