// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates. Gated behind `test-support` so it
//! doesn't ship in release builds of dependents.

use crate::id::StageId;
use crate::pipeline::Pipeline;
use crate::stage::{RetryPolicy, StageDef, StageKind};
use std::collections::HashMap;
use std::time::Duration;

pub fn stage(id: &str, deps: &[&str]) -> StageDef {
    StageDef {
        id: StageId::new(id),
        name: id.to_string(),
        kind: StageKind::Transform,
        config: HashMap::new(),
        dependencies: deps.iter().map(|d| StageId::new(*d)).collect(),
        timeout: Duration::from_secs(60),
        retry: RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(10),
            backoff_factor: 2.0,
        },
        is_critical: false,
    }
}

pub fn stage_kind(id: &str, deps: &[&str], kind: StageKind) -> StageDef {
    StageDef {
        kind,
        ..stage(id, deps)
    }
}

pub fn pipeline(stages: Vec<StageDef>) -> Pipeline {
    Pipeline {
        id: crate::id::PipelineId::new("test-pipeline"),
        name: "test-pipeline".to_string(),
        version: 1,
        description: String::new(),
        active: true,
        schedule: None,
        stages,
    }
}
