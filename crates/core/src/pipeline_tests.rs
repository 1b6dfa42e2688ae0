// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{pipeline, stage};

#[test]
fn validate_accepts_well_formed_pipeline() {
    let p = pipeline(vec![
        stage("a", &[]),
        stage("b", &["a"]),
        stage("c", &["b"]),
    ]);
    assert!(p.validate().is_ok());
}

#[test]
fn validate_rejects_empty_pipeline() {
    let p = pipeline(vec![]);
    assert_eq!(p.validate(), Err(PipelineValidationError::Empty));
}

#[test]
fn validate_rejects_duplicate_stage_ids() {
    let p = pipeline(vec![stage("a", &[]), stage("a", &[])]);
    assert_eq!(
        p.validate(),
        Err(PipelineValidationError::DuplicateStageId("a".into()))
    );
}

#[test]
fn validate_rejects_unknown_dependency() {
    let p = pipeline(vec![stage("a", &["ghost"])]);
    assert_eq!(
        p.validate(),
        Err(PipelineValidationError::UnknownDependency {
            stage: "a".into(),
            dependency: "ghost".into(),
        })
    );
}

#[test]
fn stage_lookup_by_id() {
    let p = pipeline(vec![stage("a", &[]), stage("b", &["a"])]);
    assert!(p.stage(&StageId::new("a")).is_some());
    assert!(p.stage(&StageId::new("missing")).is_none());
}
