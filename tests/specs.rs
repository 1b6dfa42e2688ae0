// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios from spec.md §8, wired against in-memory/in-process
//! port implementations (spec.md §9: "exercised without any real network
//! hop or filesystem").

use cv_api::{StartRequest, TriggerApi};
use cv_core::{
    test_support, EngineConfig, ExecutionStatus, FakeClock, PipelineId, SequentialIdGen,
    StageKind, TriggerSource,
};
use cv_coordination::InProcessCoordination;
use cv_engine::{ExecutionSupervisor, HandlerError, HandlerRegistry, StageContext, StageHandler, StageRunner};
use cv_store::{InMemoryStore, Store};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Supervisor = ExecutionSupervisor<FakeClock, SequentialIdGen>;

fn build(registry: HandlerRegistry, config: EngineConfig) -> (Supervisor, Arc<dyn Store>, FakeClock) {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let coordination: Arc<dyn cv_coordination::Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();
    let runner = StageRunner::new(store.clone(), coordination.clone(), registry, clock.clone());
    let supervisor = ExecutionSupervisor::new(
        store.clone(),
        coordination,
        runner,
        config,
        clock.clone(),
        SequentialIdGen::new("spec"),
    );
    (supervisor, store, clock)
}

async fn three_stage_pipeline(store: &Arc<dyn Store>, id: &str) {
    let stages = vec![
        test_support::stage_kind("A", &[], StageKind::Input),
        test_support::stage_kind("B", &["A"], StageKind::Transform),
        test_support::stage_kind("C", &["B"], StageKind::Output),
    ];
    let mut pipeline = test_support::pipeline(stages);
    pipeline.id = PipelineId::new(id);
    store.create_pipeline(pipeline).await.unwrap();
}

async fn run_to_terminal(store: &Arc<dyn Store>, exec_id: &str) -> cv_core::Execution {
    for _ in 0..200 {
        let exec = store.get_execution(exec_id).await.unwrap().unwrap();
        if exec.status.is_terminal() {
            return exec;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution {exec_id} did not reach a terminal state in time");
}

#[tokio::test]
async fn happy_path_completes_all_three_stages_in_order() {
    let (supervisor, store, _clock) = build(HandlerRegistry::builtin(), EngineConfig::default());
    three_stage_pipeline(&store, "p1").await;

    let exec_id = supervisor
        .start("p1", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await
        .unwrap();

    let exec = run_to_terminal(&store, exec_id.as_str()).await;
    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.completed_stages, 3);
    let completed_at_ms = exec.completed_at_ms.expect("terminal execution has completed_at_ms");
    assert_eq!(
        exec.duration_ms,
        Some(completed_at_ms.saturating_sub(exec.started_at_ms))
    );

    let logs = store.get_logs(exec_id.as_str(), None, None).await.unwrap();
    assert!(logs.iter().any(|l| l.message == "Execution order: A -> B -> C"));
}

/// Fails the configured number of attempts, then succeeds.
struct FlakyHandler {
    failures_remaining: AtomicU32,
}

#[async_trait::async_trait]
impl StageHandler for FlakyHandler {
    async fn run(
        &self,
        _stage: &cv_core::StageDef,
        _ctx: &StageContext,
    ) -> Result<serde_json::Value, HandlerError> {
        if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
            Err(HandlerError::Failed("transient".to_string()))
        } else {
            Ok(serde_json::json!({"records": []}))
        }
    }
}

/// Always fails.
struct AlwaysFailHandler;

#[async_trait::async_trait]
impl StageHandler for AlwaysFailHandler {
    async fn run(
        &self,
        _stage: &cv_core::StageDef,
        _ctx: &StageContext,
    ) -> Result<serde_json::Value, HandlerError> {
        Err(HandlerError::Failed("handler always fails".to_string()))
    }
}

fn registry_with_b(handler: Arc<dyn StageHandler>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::builtin();
    registry.register("transform", handler);
    registry
}

#[tokio::test]
async fn retry_then_success_completes_with_one_recorded_retry() {
    let registry = registry_with_b(Arc::new(FlakyHandler {
        failures_remaining: AtomicU32::new(1),
    }));
    let (supervisor, store, _clock) = build(registry, EngineConfig::default());

    let stages = vec![
        test_support::stage_kind("A", &[], StageKind::Input),
        {
            let mut b = test_support::stage_kind("B", &["A"], StageKind::Transform);
            b.retry.max_retries = 2;
            b.retry.base_delay = Duration::from_millis(1);
            b
        },
        test_support::stage_kind("C", &["B"], StageKind::Output),
    ];
    let mut pipeline = test_support::pipeline(stages);
    pipeline.id = PipelineId::new("p2");
    store.create_pipeline(pipeline).await.unwrap();

    let exec_id = supervisor
        .start("p2", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await
        .unwrap();
    let exec = run_to_terminal(&store, exec_id.as_str()).await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    let stage_b = store
        .get_stage_execution(exec_id.as_str(), "B")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stage_b.retry_count, 1);
}

#[tokio::test]
async fn non_critical_stage_failure_is_skipped_and_execution_still_completes() {
    let registry = registry_with_b(Arc::new(AlwaysFailHandler));
    let (supervisor, store, _clock) = build(registry, EngineConfig::default());

    let stages = vec![
        test_support::stage_kind("A", &[], StageKind::Input),
        {
            let mut b = test_support::stage_kind("B", &["A"], StageKind::Transform);
            b.is_critical = false;
            b.retry.max_retries = 1;
            b.retry.base_delay = Duration::from_millis(1);
            b
        },
        test_support::stage_kind("C", &["A"], StageKind::Output),
    ];
    let mut pipeline = test_support::pipeline(stages);
    pipeline.id = PipelineId::new("p3");
    store.create_pipeline(pipeline).await.unwrap();

    let exec_id = supervisor
        .start("p3", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await
        .unwrap();
    let exec = run_to_terminal(&store, exec_id.as_str()).await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    assert_eq!(exec.completed_stages, 2);
}

#[tokio::test]
async fn critical_stage_failure_fails_the_execution_and_releases_the_lock() {
    let registry = registry_with_b(Arc::new(AlwaysFailHandler));
    let (supervisor, store, _clock) = build(registry, EngineConfig::default());

    let stages = vec![
        test_support::stage_kind("A", &[], StageKind::Input),
        {
            let mut b = test_support::stage_kind("B", &["A"], StageKind::Transform);
            b.is_critical = true;
            b.retry.max_retries = 1;
            b.retry.base_delay = Duration::from_millis(1);
            b
        },
        test_support::stage_kind("C", &["B"], StageKind::Output),
    ];
    let mut pipeline = test_support::pipeline(stages);
    pipeline.id = PipelineId::new("p4");
    store.create_pipeline(pipeline).await.unwrap();

    let exec_id = supervisor
        .start("p4", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await
        .unwrap();
    let exec = run_to_terminal(&store, exec_id.as_str()).await;

    assert_eq!(exec.status, ExecutionStatus::Failed);
    assert_eq!(exec.completed_stages, 1);
    assert!(exec.error.as_ref().unwrap().contains('B'));

    // A second start now succeeds, proving the lock was released.
    let second = supervisor
        .start("p4", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn duplicate_concurrent_start_requests_admit_exactly_one_execution() {
    let (supervisor, store, _clock) = build(HandlerRegistry::builtin(), EngineConfig::default());
    three_stage_pipeline(&store, "p5").await;

    let first = supervisor
        .start("p5", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await;
    let second = supervisor
        .start("p5", HashMap::new(), TriggerSource::Manual, HashMap::new())
        .await;

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[tokio::test]
async fn liveness_reaper_fails_an_execution_with_a_stale_heartbeat() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let coordination: Arc<dyn cv_coordination::Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();

    three_stage_pipeline(&store, "p6").await;
    let pipeline = store.get_pipeline(&PipelineId::new("p6")).await.unwrap().unwrap();

    let exec_id = cv_core::ExecutionId::new("stuck-exec");
    let mut execution = cv_core::Execution::new(
        exec_id.clone(),
        pipeline.id.clone(),
        pipeline.name.clone(),
        pipeline.stages.len(),
        TriggerSource::Manual,
        HashMap::new(),
        HashMap::new(),
        None,
        clock.epoch_ms(),
    );
    execution.status = ExecutionStatus::Running;
    store.create_execution(execution).await.unwrap();
    store
        .try_acquire_lock(
            &pipeline.id,
            &cv_core::LockHolderId::new("crashed-supervisor"),
            Duration::from_secs(3600),
            clock.epoch_ms(),
        )
        .await
        .unwrap();

    // No heartbeat is ever recorded for this execution, so it is dead on
    // the reaper's very first sweep.
    let shutdown = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let reaper = cv_engine::Reaper::spawn(
        store.clone(),
        coordination,
        Duration::from_millis(5),
        clock,
        shutdown.clone(),
    );

    let mut reaped = None;
    for _ in 0..200 {
        let exec = store.get_execution(exec_id.as_str()).await.unwrap().unwrap();
        if exec.status.is_terminal() {
            reaped = Some(exec);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.store(true, Ordering::SeqCst);
    reaper.stop();

    let exec = reaped.expect("reaper did not fail the stuck execution in time");
    assert_eq!(exec.status, ExecutionStatus::Failed);
    assert_eq!(exec.error.as_deref(), Some("liveness lost"));

    // Lock released: a fresh start for the same pipeline now succeeds.
    let new_holder = cv_core::LockHolderId::new("replacement-supervisor");
    let reacquired = store
        .try_acquire_lock(&pipeline.id, &new_holder, Duration::from_secs(60), 9_999_999_999_999)
        .await
        .unwrap();
    assert!(reacquired);
}

#[tokio::test]
async fn trigger_api_round_trips_start_status_logs_and_stop() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let coordination: Arc<dyn cv_coordination::Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();
    let runner = StageRunner::new(store.clone(), coordination.clone(), HandlerRegistry::builtin(), clock.clone());
    let supervisor = ExecutionSupervisor::new(
        store.clone(),
        coordination,
        runner,
        EngineConfig::default(),
        clock,
        SequentialIdGen::new("api"),
    );
    let api = TriggerApi::new(supervisor, store.clone());
    three_stage_pipeline(&store, "p7").await;

    let resp = api
        .start(StartRequest {
            pipeline_id: "p7".to_string(),
            variables: HashMap::new(),
            trigger_source: TriggerSource::Manual,
            trigger_metadata: HashMap::new(),
        })
        .await
        .unwrap();

    let exec = run_to_terminal(&store, &resp.execution_id).await;
    assert_eq!(exec.status, ExecutionStatus::Completed);

    let status = api.status(&resp.execution_id).await.unwrap();
    assert_eq!(status.status, ExecutionStatus::Completed);

    let logs = api.logs(&resp.execution_id, None, None).await.unwrap();
    assert!(!logs.is_empty());

    let stop_err = api.stop(&resp.execution_id).await.unwrap_err();
    assert_eq!(stop_err.status_code(), 409);
}
