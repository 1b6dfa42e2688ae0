use super::*;
use crate::handlers::HandlerRegistry;
use cv_coordination::InProcessCoordination;
use cv_core::{test_support, FakeClock, SequentialIdGen};
use cv_store::InMemoryStore;
use std::time::Duration;

fn build_supervisor(config: EngineConfig) -> (ExecutionSupervisor<FakeClock, SequentialIdGen>, Arc<dyn Store>) {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let coordination: Arc<dyn Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();
    let runner = StageRunner::new(
        store.clone(),
        coordination.clone(),
        HandlerRegistry::builtin(),
        clock.clone(),
    );
    let supervisor = ExecutionSupervisor::new(
        store.clone(),
        coordination,
        runner,
        config,
        clock,
        SequentialIdGen::new("test"),
    );
    (supervisor, store)
}

async fn seed_pipeline(store: &Arc<dyn Store>, id: &str) {
    let stages = vec![
        test_support::stage_kind("in", &[], cv_core::StageKind::Input),
        test_support::stage_kind("out", &["in"], cv_core::StageKind::Output),
    ];
    let mut pipeline = test_support::pipeline(stages);
    pipeline.id = cv_core::PipelineId::new(id);
    store.create_pipeline(pipeline).await.unwrap();
}

#[tokio::test]
async fn start_rejects_unknown_pipeline() {
    let (supervisor, _store) = build_supervisor(EngineConfig::default());
    let err = supervisor
        .start("missing", Default::default(), TriggerSource::Manual, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::UnknownPipeline(_)));
}

#[tokio::test]
async fn start_admits_and_runs_a_healthy_pipeline() {
    let (supervisor, store) = build_supervisor(EngineConfig::default());
    seed_pipeline(&store, "p1").await;

    let exec_id = supervisor
        .start("p1", Default::default(), TriggerSource::Manual, Default::default())
        .await
        .unwrap();

    for _ in 0..50 {
        let exec = store.get_execution(exec_id.as_str()).await.unwrap().unwrap();
        if exec.status.is_terminal() {
            assert_eq!(exec.status, ExecutionStatus::Completed);
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("execution did not reach a terminal state in time");
}

#[tokio::test]
async fn start_rejects_duplicate_while_pipeline_lock_held() {
    let (supervisor, store) = build_supervisor(EngineConfig::default());
    seed_pipeline(&store, "p1").await;

    let _first = supervisor
        .start("p1", Default::default(), TriggerSource::Manual, Default::default())
        .await
        .unwrap();
    let second = supervisor
        .start("p1", Default::default(), TriggerSource::Manual, Default::default())
        .await;
    assert!(matches!(second, Err(SupervisorError::Duplicate(_))));
}

#[tokio::test]
async fn start_blocks_high_risk_when_configured() {
    let config = EngineConfig {
        block_high_risk: true,
        risk_threshold_low: 0.0,
        risk_threshold_medium: 0.0,
        risk_threshold_high: 0.0,
        ..Default::default()
    };
    let (supervisor, store) = build_supervisor(config);
    seed_pipeline(&store, "p1").await;

    let err = supervisor
        .start("p1", Default::default(), TriggerSource::Manual, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::Blocked(_)));
}

#[tokio::test]
async fn cancel_pause_resume_report_not_found_for_unknown_execution() {
    let (supervisor, _store) = build_supervisor(EngineConfig::default());
    assert!(matches!(supervisor.cancel("nope").await, Err(SupervisorError::NotFound(_))));
    assert!(matches!(supervisor.pause("nope").await, Err(SupervisorError::NotFound(_))));
    assert!(matches!(supervisor.resume("nope").await, Err(SupervisorError::NotFound(_))));
}

#[tokio::test]
async fn cancel_on_terminal_execution_is_a_conflict() {
    let (supervisor, store) = build_supervisor(EngineConfig::default());
    seed_pipeline(&store, "p1").await;

    let exec_id = supervisor
        .start("p1", Default::default(), TriggerSource::Manual, Default::default())
        .await
        .unwrap();

    for _ in 0..50 {
        let exec = store.get_execution(exec_id.as_str()).await.unwrap().unwrap();
        if exec.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let err = supervisor.cancel(exec_id.as_str()).await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyTerminal(_)));
}

#[tokio::test]
async fn resume_on_running_execution_reports_not_paused() {
    let (supervisor, store) = build_supervisor(EngineConfig::default());
    seed_pipeline(&store, "p1").await;

    let exec_id = supervisor
        .start("p1", Default::default(), TriggerSource::Manual, Default::default())
        .await
        .unwrap();

    let err = supervisor.resume(exec_id.as_str()).await.unwrap_err();
    assert!(matches!(err, SupervisorError::NotPaused(_)));
}
