use super::*;
use cv_core::test_support;
use cv_core::{ExecutionId, FakeClock, PipelineId, TriggerSource};
use cv_coordination::InProcessCoordination;
use cv_store::InMemoryStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn execution(id: &str) -> Execution {
    Execution::new(
        ExecutionId::new(id),
        PipelineId::new("p1"),
        "p1".to_string(),
        1,
        TriggerSource::Manual,
        HashMap::new(),
        HashMap::new(),
        None,
        1_700_000_000_000,
    )
}

struct FlakyHandler {
    failures_remaining: AtomicU32,
}

#[async_trait::async_trait]
impl crate::handlers::StageHandler for FlakyHandler {
    async fn run(
        &self,
        _stage: &StageDef,
        _ctx: &StageContext,
    ) -> Result<serde_json::Value, crate::error::HandlerError> {
        if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
            Err(crate::error::HandlerError::Failed("transient".into()))
        } else {
            Ok(serde_json::json!({"ok": true}))
        }
    }
}

fn runner_with(registry: HandlerRegistry) -> StageRunner<FakeClock> {
    StageRunner::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InProcessCoordination::new()),
        registry,
        FakeClock::new(),
    )
}

#[tokio::test]
async fn succeeds_on_first_attempt_and_records_output() {
    let runner = runner_with(HandlerRegistry::builtin());
    let stage = test_support::stage_kind("s1", &[], cv_core::StageKind::Input);
    let exec = execution("e1");

    let output = runner.run(&exec, &stage).await.unwrap();
    assert_eq!(output["count"], 0);
}

#[tokio::test]
async fn unknown_kind_is_rejected_immediately() {
    let runner = runner_with(HandlerRegistry::new());
    let stage = test_support::stage("s1", &[]);
    let exec = execution("e1");

    let err = runner.run(&exec, &stage).await.unwrap_err();
    assert!(matches!(err, RunnerError::UnknownKind(_)));
}

#[tokio::test]
async fn retries_until_success_within_budget() {
    let mut registry = HandlerRegistry::new();
    registry.register(
        "transform",
        Arc::new(FlakyHandler {
            failures_remaining: AtomicU32::new(2),
        }),
    );
    let runner = runner_with(registry);

    let mut stage = test_support::stage("s1", &[]);
    stage.retry.max_retries = 3;
    stage.retry.base_delay = Duration::from_millis(1);
    let exec = execution("e1");

    let output = runner.run(&exec, &stage).await.unwrap();
    assert_eq!(output["ok"], true);
}

#[tokio::test]
async fn exhausts_retries_and_returns_last_error() {
    let mut registry = HandlerRegistry::new();
    registry.register(
        "transform",
        Arc::new(FlakyHandler {
            failures_remaining: AtomicU32::new(100),
        }),
    );
    let runner = runner_with(registry);

    let mut stage = test_support::stage("s1", &[]);
    stage.retry.max_retries = 1;
    stage.retry.base_delay = Duration::from_millis(1);
    let exec = execution("e1");

    let err = runner.run(&exec, &stage).await.unwrap_err();
    assert!(matches!(err, RunnerError::Exhausted(_)));
}

#[tokio::test]
async fn passes_first_dependency_result_as_input() {
    let runner = runner_with(HandlerRegistry::builtin());
    let stage = test_support::stage_kind("s2", &["s1"], cv_core::StageKind::Transform);
    let mut exec = execution("e1");
    exec.results.insert(
        "s1".to_string(),
        serde_json::json!({"records": [{"id": 1}, {"id": 2}]}),
    );

    let output = runner.run(&exec, &stage).await.unwrap();
    assert_eq!(output["input_count"], 2);
}
