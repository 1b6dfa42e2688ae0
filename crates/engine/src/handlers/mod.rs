// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage handler registry (spec.md §4.7, §9 "registry keyed by kind").
//!
//! The four built-in kinds are a closed sum type at the pipeline
//! definition boundary (`StageKind`), but resolved through a registry
//! keyed by name internally so a handler can be swapped or added without
//! touching `StageRunner`.

mod input;
mod output;
mod transform;
mod validation;

pub use input::InputHandler;
pub use output::OutputHandler;
pub use transform::TransformHandler;
pub use validation::ValidationHandler;

use crate::error::HandlerError;
use async_trait::async_trait;
use cv_core::StageDef;
use std::collections::HashMap;
use std::sync::Arc;

/// Variables plus the result of the stage's first dependency (spec.md
/// §4.7: "handlers read inputs from the first dependency's result, or
/// empty when no dependency").
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    pub variables: HashMap<String, String>,
    pub input: Option<serde_json::Value>,
}

#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn run(&self, stage: &StageDef, ctx: &StageContext) -> Result<serde_json::Value, HandlerError>;
}

/// Resolves a stage's `kind` to a `StageHandler`, keyed by name rather
/// than matched on the enum, so the built-in set stays replaceable
/// (spec.md §9; SPEC_FULL.md §10 "handler registry").
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The closed set of built-in handlers (spec.md §4.7 step 3).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("input", Arc::new(InputHandler));
        registry.register("transform", Arc::new(TransformHandler));
        registry.register("validation", Arc::new(ValidationHandler));
        registry.register("output", Arc::new(OutputHandler));
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn StageHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn StageHandler>> {
        self.handlers.get(kind).cloned()
    }
}

/// Shared by transform/validation/output: a stage's input is whatever the
/// upstream stage's output carried under `records` or `data`.
pub(crate) fn extract_records(input: &Option<serde_json::Value>) -> Vec<serde_json::Value> {
    match input.as_ref().and_then(|v| v.as_object()) {
        Some(map) => map
            .get("records")
            .or_else(|| map.get("data"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
