use super::*;
use cv_coordination::InProcessCoordination;
use cv_core::{ExecutionId, FakeClock, PipelineId, TriggerSource};
use cv_store::InMemoryStore;
use std::collections::HashMap;
use std::time::Duration;

fn running_execution(id: &str, pipeline: &str) -> cv_core::Execution {
    let mut exec = cv_core::Execution::new(
        ExecutionId::new(id),
        PipelineId::new(pipeline),
        pipeline.to_string(),
        1,
        TriggerSource::Manual,
        HashMap::new(),
        HashMap::new(),
        None,
        1_700_000_000_000,
    );
    exec.status = ExecutionStatus::Running;
    exec
}

#[tokio::test]
async fn heartbeat_loop_keeps_execution_alive() {
    let coordination: Arc<dyn Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();
    let shutdown = Arc::new(AtomicBool::new(false));

    let loop_handle = HeartbeatLoop::spawn(
        coordination.clone(),
        "e1".to_string(),
        Duration::from_millis(10),
        Duration::from_secs(30),
        clock.clone(),
        shutdown.clone(),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(coordination.is_alive("e1", clock.epoch_ms()).await);

    loop_handle.stop();
}

#[tokio::test]
async fn reaper_fails_executions_with_no_heartbeat() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let coordination: Arc<dyn Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();

    store
        .create_execution(running_execution("e1", "p1"))
        .await
        .unwrap();

    Reaper::sweep(&store, &coordination, &clock).await;

    let updated = store.get_execution("e1").await.unwrap().unwrap();
    assert_eq!(updated.status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn reaper_leaves_live_executions_running() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let coordination: Arc<dyn Coordination> = Arc::new(InProcessCoordination::new());
    let clock = FakeClock::new();

    store
        .create_execution(running_execution("e1", "p1"))
        .await
        .unwrap();
    coordination
        .heartbeat("e1", Duration::from_secs(30), clock.epoch_ms())
        .await;

    Reaper::sweep(&store, &coordination, &clock).await;

    let updated = store.get_execution("e1").await.unwrap().unwrap();
    assert_eq!(updated.status, ExecutionStatus::Running);
}
