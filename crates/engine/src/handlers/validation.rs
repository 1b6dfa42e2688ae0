// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in `validation` stage handler (spec.md §4.7 step 3): a missing
//! `schema` is pass-through (everything valid); a present `schema` is
//! interpreted as a list of required field names, the narrowest schema
//! shape that lets the handler actually reject something.

use super::{extract_records, StageContext, StageHandler};
use crate::error::HandlerError;
use async_trait::async_trait;
use cv_core::StageDef;
use serde_json::{json, Value};

pub struct ValidationHandler;

#[async_trait]
impl StageHandler for ValidationHandler {
    async fn run(&self, stage: &StageDef, ctx: &StageContext) -> Result<serde_json::Value, HandlerError> {
        let records = extract_records(&ctx.input);
        let total = records.len();
        let schema = stage.config.get("schema").cloned();

        let (valid, invalid) = match schema.as_ref().and_then(Value::as_array) {
            None => (total, 0),
            Some(fields) => {
                let required: Vec<&str> = fields.iter().filter_map(Value::as_str).collect();
                let valid = records
                    .iter()
                    .filter(|r| required.iter().all(|f| r.get(f).is_some()))
                    .count();
                (valid, total - valid)
            }
        };

        Ok(json!({
            "total": total,
            "valid": valid,
            "invalid": invalid,
            "schema": schema.unwrap_or(Value::Null),
        }))
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
