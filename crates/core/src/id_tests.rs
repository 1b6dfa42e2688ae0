// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sequential_id_gen_increments() {
    let gen = SequentialIdGen::new("exec");
    assert_eq!(gen.next(), "exec-1");
    assert_eq!(gen.next(), "exec-2");
}

#[test]
fn short_truncates_but_never_panics_on_short_strings() {
    let id = PipelineId::new("ab");
    assert_eq!(id.short(10), "ab");
    let id = PipelineId::new("abcdefghij");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn execution_ids_sort_by_creation_time() {
    let gen = SequentialIdGen::new("e");
    let a = new_execution_id(1_000, &gen);
    let b = new_execution_id(2_000, &gen);
    assert!(a.as_str() < b.as_str());
}

#[test]
fn pipeline_id_equality_with_str() {
    let id = PipelineId::new("nightly-etl");
    assert_eq!(id, "nightly-etl");
}
