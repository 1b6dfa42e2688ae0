// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn exec() -> Execution {
    Execution::new(
        ExecutionId::new("e1"),
        PipelineId::new("p1"),
        "p1".into(),
        3,
        TriggerSource::Manual,
        HashMap::new(),
        HashMap::new(),
        Some(0.1),
        1_000,
    )
}

#[test]
fn new_execution_starts_pending() {
    let e = exec();
    assert_eq!(e.status, ExecutionStatus::Pending);
    assert_eq!(e.completed_stages, 0);
    assert!(e.completed_at_ms.is_none());
}

#[test]
fn finish_sets_duration_and_completed_at() {
    let mut e = exec();
    e.status = ExecutionStatus::Running;
    e.finish(ExecutionStatus::Completed, 1_500, None);
    assert_eq!(e.status, ExecutionStatus::Completed);
    assert_eq!(e.completed_at_ms, Some(1_500));
    assert_eq!(e.duration_ms, Some(500));
}

#[test]
fn finish_is_idempotent_on_terminal_state() {
    let mut e = exec();
    e.status = ExecutionStatus::Running;
    e.finish(ExecutionStatus::Completed, 1_500, None);
    let first = e.clone();
    e.finish(ExecutionStatus::Failed, 9_999, Some("ignored".into()));
    assert_eq!(e.status, first.status);
    assert_eq!(e.completed_at_ms, first.completed_at_ms);
    assert_eq!(e.duration_ms, first.duration_ms);
    assert_eq!(e.error, first.error);
}

#[test]
fn valid_transitions_per_state_machine() {
    let mut e = exec();
    assert!(e.can_transition_to(ExecutionStatus::Running));
    e.status = ExecutionStatus::Running;
    assert!(e.can_transition_to(ExecutionStatus::Paused));
    assert!(e.can_transition_to(ExecutionStatus::Completed));
    assert!(e.can_transition_to(ExecutionStatus::RolledBack));
    e.status = ExecutionStatus::Paused;
    assert!(e.can_transition_to(ExecutionStatus::Running));
    assert!(e.can_transition_to(ExecutionStatus::Cancelled));
}

#[test]
fn terminal_states_reject_outgoing_transitions() {
    let mut e = exec();
    e.status = ExecutionStatus::Completed;
    assert!(!e.can_transition_to(ExecutionStatus::Running));
    assert!(!e.can_transition_to(ExecutionStatus::Failed));
    assert!(e.can_transition_to(ExecutionStatus::Completed)); // idempotent
}

#[test]
fn stage_execution_starts_pending_with_no_output() {
    let se = StageExecution::pending(ExecutionId::new("e1"), StageId::new("a"));
    assert_eq!(se.status, StageExecutionStatus::Pending);
    assert_eq!(se.retry_count, 0);
    assert!(se.output.is_none());
}
