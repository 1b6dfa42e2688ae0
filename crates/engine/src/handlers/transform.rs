// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in `transform` stage handler (spec.md §4.7 step 3): passes data
//! through unchanged. The `operation` name is recorded but not
//! interpreted — real transforms are out of scope (spec.md §1 "stage
//! bodies are chosen from a small, closed set of handler kinds").

use super::{extract_records, StageContext, StageHandler};
use crate::error::HandlerError;
use async_trait::async_trait;
use cv_core::StageDef;
use serde_json::json;

pub struct TransformHandler;

#[async_trait]
impl StageHandler for TransformHandler {
    async fn run(&self, stage: &StageDef, ctx: &StageContext) -> Result<serde_json::Value, HandlerError> {
        let operation = stage
            .config
            .get("operation")
            .and_then(|v| v.as_str())
            .unwrap_or("identity")
            .to_string();
        let records = extract_records(&ctx.input);
        let input_count = records.len();
        Ok(json!({
            "operation": operation,
            "input_count": input_count,
            "output_count": input_count,
            "data": records,
        }))
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
