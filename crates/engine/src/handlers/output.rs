// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in `output` stage handler (spec.md §4.7 step 3): a sink stage.
//! "No exactly-once delivery to sink stages" (spec.md §1) means this
//! never actually writes anywhere — it reports what it would have
//! written.

use super::{extract_records, StageContext, StageHandler};
use crate::error::HandlerError;
use async_trait::async_trait;
use cv_core::StageDef;
use serde_json::json;

pub struct OutputHandler;

#[async_trait]
impl StageHandler for OutputHandler {
    async fn run(&self, stage: &StageDef, ctx: &StageContext) -> Result<serde_json::Value, HandlerError> {
        let destination = stage
            .config
            .get("destination")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let records_written = extract_records(&ctx.input).len();
        Ok(json!({
            "destination": destination,
            "records_written": records_written,
            "success": true,
        }))
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
