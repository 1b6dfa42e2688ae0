// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution Supervisor (spec.md §4.8): admission, ordering/dispatch, and
//! finalization for one pipeline run. Carries the engine's control flow.

use crate::error::SupervisorError;
use crate::heartbeat::HeartbeatLoop;
use crate::runner::StageRunner;
use cv_coordination::Coordination;
use cv_core::{
    new_execution_id, Clock, EngineConfig, Execution, ExecutionId, ExecutionStatus, IdGen,
    Insight, InsightKind, InsightScope, InsightSeverity, LockHolderId, LogEntry, LogLevel,
    PipelineId, StageExecution, TriggerSource, UuidIdGen,
};
use cv_planner::plan;
use cv_safety::{select, AnomalySeverity, RemediationAction, RemediationContext, RiskThresholds};
use cv_store::{ExecutionStatusUpdate, Store};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rolling-window size used for risk assessment (spec.md §4.3).
const STATS_WINDOW_DAYS: u32 = 7;

/// Advisory per-execution flags checked between stage transitions
/// (spec.md §4.8 "Cancel/pause/resume").
#[derive(Default)]
struct ActiveFlags {
    cancelled: AtomicBool,
    paused: AtomicBool,
}

struct Inner<C: Clock, G: IdGen> {
    store: Arc<dyn Store>,
    coordination: Arc<dyn Coordination>,
    runner: StageRunner<C>,
    config: EngineConfig,
    clock: C,
    id_gen: G,
    active: Mutex<HashMap<String, Arc<ActiveFlags>>>,
    shutdown: Arc<AtomicBool>,
}

/// Owns an execution end-to-end: admission, dispatch, finalization.
///
/// Cheap to clone (an `Arc` around its state), so the same handle can be
/// captured by the spawned per-execution task and by the Trigger API.
pub struct ExecutionSupervisor<C: Clock, G: IdGen = UuidIdGen> {
    inner: Arc<Inner<C, G>>,
}

impl<C: Clock, G: IdGen> Clone for ExecutionSupervisor<C, G> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Concrete handle type for callers (the Trigger API) that don't need to
/// be generic over clock/id-generator choice.
pub type SupervisorHandle = ExecutionSupervisor<cv_core::SystemClock, UuidIdGen>;

impl<C: Clock, G: IdGen> ExecutionSupervisor<C, G> {
    pub fn new(
        store: Arc<dyn Store>,
        coordination: Arc<dyn Coordination>,
        runner: StageRunner<C>,
        config: EngineConfig,
        clock: C,
        id_gen: G,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                coordination,
                runner,
                config,
                clock,
                id_gen,
                active: Mutex::new(HashMap::new()),
                shutdown: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Signals every in-flight execution's cooperative shutdown path
    /// (spec.md §5); suspension points observe this within `shutdown_grace`.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
    }

    fn risk_thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            low: self.inner.config.risk_threshold_low,
            medium: self.inner.config.risk_threshold_medium,
            high: self.inner.config.risk_threshold_high,
        }
    }

    /// Admission (spec.md §4.8): risk-assess, dedupe, lock, create rows,
    /// then spawn the dispatch loop as a background task.
    pub async fn start(
        &self,
        pipeline_id: &str,
        variables: HashMap<String, String>,
        trigger_source: TriggerSource,
        trigger_metadata: HashMap<String, String>,
    ) -> Result<ExecutionId, SupervisorError> {
        let pipeline_id_typed = PipelineId::new(pipeline_id);
        let now_ms = self.inner.clock.epoch_ms();

        let pipeline = match self.inner.coordination.get_cached_pipeline(pipeline_id, now_ms).await {
            Some(p) => p,
            None => {
                let p = self
                    .inner
                    .store
                    .get_pipeline(&pipeline_id_typed)
                    .await?
                    .ok_or_else(|| SupervisorError::UnknownPipeline(pipeline_id.to_string()))?;
                self.inner
                    .coordination
                    .cache_pipeline(pipeline_id, p.clone(), self.inner.config.default_execution_timeout, now_ms)
                    .await;
                p
            }
        };

        let stats = self
            .inner
            .store
            .get_execution_stats(&pipeline_id_typed, STATS_WINDOW_DAYS)
            .await?;
        let assessment = cv_safety::assess(
            &stats,
            self.risk_thresholds(),
            self.inner.config.default_execution_timeout.as_secs_f64(),
        );

        if self.inner.config.block_high_risk && assessment.level.is_blockable() {
            let severity = match assessment.level {
                cv_safety::RiskLevel::Low => InsightSeverity::Low,
                cv_safety::RiskLevel::Medium => InsightSeverity::Medium,
                cv_safety::RiskLevel::High => InsightSeverity::High,
                cv_safety::RiskLevel::Critical => InsightSeverity::Critical,
            };
            self.inner
                .store
                .record_insight(Insight {
                    id: cv_core::InsightId::new(self.inner.id_gen.next()),
                    scope: InsightScope::Pipeline,
                    kind: InsightKind::AdmissionBlocked,
                    severity,
                    title: "execution blocked by risk assessment".to_string(),
                    message: assessment.explanation.clone(),
                    recommendation: assessment
                        .recommendations
                        .first()
                        .cloned()
                        .unwrap_or_default(),
                    confidence: assessment.score,
                    factors: assessment.factors.iter().map(|f| f.name.to_string()).collect(),
                    explanation: assessment.explanation.clone(),
                    resolved: false,
                    created_at_ms: now_ms,
                })
                .await?;
            return Err(SupervisorError::Blocked(assessment.level));
        }

        let acquired = self
            .inner
            .coordination
            .try_prevent_duplicate(pipeline_id, self.inner.config.default_execution_timeout, now_ms)
            .await;
        if !acquired {
            return Err(SupervisorError::Duplicate(pipeline_id.to_string()));
        }

        let holder = LockHolderId::new(format!("supervisor-{}", self.inner.id_gen.next()));
        if !self
            .acquire_pipeline_lock(&pipeline_id_typed, &holder, now_ms)
            .await?
        {
            self.inner.coordination.release_pipeline(pipeline_id).await;
            return Err(SupervisorError::LockUnavailable(pipeline_id.to_string()));
        }

        let execution_id = new_execution_id(now_ms, &self.inner.id_gen);
        let execution = Execution::new(
            execution_id.clone(),
            pipeline_id_typed.clone(),
            pipeline.name.clone(),
            pipeline.stages.len(),
            trigger_source,
            trigger_metadata,
            variables,
            Some(assessment.score),
            now_ms,
        );
        self.inner.store.create_execution(execution.clone()).await?;
        for stage in &pipeline.stages {
            self.inner
                .store
                .create_stage_execution(StageExecution::pending(execution_id.clone(), stage.id.clone()))
                .await?;
        }

        let flags = Arc::new(ActiveFlags::default());
        self.inner
            .active
            .lock()
            .insert(execution_id.as_str().to_string(), flags.clone());

        let heartbeat = HeartbeatLoop::spawn(
            self.inner.coordination.clone(),
            execution_id.as_str().to_string(),
            self.inner.config.heartbeat_interval,
            self.inner.config.heartbeat_ttl,
            self.inner.clock.clone(),
            self.inner.shutdown.clone(),
        );

        let supervisor = self.clone();
        let pipeline_for_task = pipeline;
        let holder_for_task = holder;
        tokio::spawn(async move {
            supervisor
                .dispatch(pipeline_for_task, execution, flags, heartbeat, holder_for_task)
                .await;
        });

        Ok(execution_id)
    }

    async fn acquire_pipeline_lock(
        &self,
        pipeline_id: &PipelineId,
        holder: &LockHolderId,
        now_ms: u64,
    ) -> Result<bool, SupervisorError> {
        for attempt in 0..=self.inner.config.lock_max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.inner.config.lock_retry_delay).await;
            }
            if self
                .inner
                .store
                .try_acquire_lock(pipeline_id, holder, self.inner.config.lock_ttl, now_ms)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Ordering and dispatch, then finalization (spec.md §4.8).
    async fn dispatch(
        &self,
        pipeline: cv_core::Pipeline,
        mut execution: Execution,
        flags: Arc<ActiveFlags>,
        heartbeat: HeartbeatLoop,
        holder: LockHolderId,
    ) {
        let exec_id = execution.id.as_str().to_string();
        let now_ms = self.inner.clock.epoch_ms();
        self.inner
            .coordination
            .set_execution_state(
                &exec_id,
                ExecutionStatus::Running,
                HashMap::new(),
                self.inner.config.default_execution_timeout,
                now_ms,
            )
            .await;
        if let Err(e) = self
            .inner
            .store
            .update_execution_status(
                &exec_id,
                ExecutionStatus::Running,
                ExecutionStatusUpdate::default(),
                now_ms,
            )
            .await
        {
            tracing::error!(exec_id = %exec_id, error = %e, "could not mark execution running");
        }

        let outcome = self.run_stages(&pipeline, &mut execution, &flags).await;
        self.finalize(&pipeline.id, &exec_id, execution, outcome, heartbeat, holder)
            .await;
    }

    async fn run_stages(
        &self,
        pipeline: &cv_core::Pipeline,
        execution: &mut Execution,
        flags: &ActiveFlags,
    ) -> Result<(), (ExecutionStatus, String)> {
        let exec_id = execution.id.as_str().to_string();
        let order = plan(pipeline).map_err(|e| (ExecutionStatus::Failed, e.to_string()))?;
        let order_ids: Vec<String> = order.order.iter().map(|s| s.to_string()).collect();
        tracing::info!(exec_id = %exec_id, order = ?order_ids, "dispatch order resolved");
        if let Err(e) = self
            .inner
            .store
            .append_log(LogEntry::new(
                ExecutionId::new(&exec_id),
                LogLevel::Info,
                format!("Execution order: {}", order_ids.join(" -> ")),
                self.inner.clock.epoch_ms(),
            ))
            .await
        {
            tracing::error!(exec_id = %exec_id, error = %e, "failed to append order log entry");
        }

        for stage_id in &order.order {
            loop {
                if flags.cancelled.load(Ordering::SeqCst) || self.inner.shutdown.load(Ordering::SeqCst) {
                    return Err((ExecutionStatus::Cancelled, "cancelled".to_string()));
                }
                if !flags.paused.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let Some(stage) = pipeline.stage(stage_id) else {
                continue;
            };
            execution.current_stage = Some(stage_id.clone());
            self.inner
                .coordination
                .set_execution_state(
                    &exec_id,
                    ExecutionStatus::Running,
                    HashMap::new(),
                    self.inner.config.default_execution_timeout,
                    self.inner.clock.epoch_ms(),
                )
                .await;

            match self.inner.runner.run(execution, stage).await {
                Ok(output) => {
                    execution.results.insert(stage_id.as_str().to_string(), output);
                    execution.completed_stages += 1;
                }
                Err(err) => {
                    let decision = select(RemediationContext {
                        has_error: true,
                        anomaly_severity: AnomalySeverity::None,
                        is_critical: stage.is_critical,
                        retries_used: stage.retry.max_retries,
                        max_retries: stage.retry.max_retries,
                        risk_level: execution
                            .risk_score
                            .map(|s| self.risk_thresholds().level_for(s))
                            .unwrap_or(cv_safety::RiskLevel::Low),
                        recoverable: false,
                        unresolved_safety_violation: false,
                    });

                    match decision.action {
                        RemediationAction::SkipStage => {
                            tracing::warn!(exec_id = %exec_id, stage = %stage_id, rationale = %decision.rationale, "skipping stage");
                            if let Err(e) = self
                                .inner
                                .store
                                .record_insight(Insight {
                                    id: cv_core::InsightId::new(self.inner.id_gen.next()),
                                    scope: InsightScope::Stage,
                                    kind: InsightKind::Remediation,
                                    severity: InsightSeverity::Medium,
                                    title: format!("stage {stage_id} skipped"),
                                    message: decision.rationale.clone(),
                                    recommendation: "review handler reliability for this stage".to_string(),
                                    confidence: 1.0,
                                    factors: vec!["action_taken:skip_stage".to_string()],
                                    explanation: decision.rationale.clone(),
                                    resolved: false,
                                    created_at_ms: self.inner.clock.epoch_ms(),
                                })
                                .await
                            {
                                tracing::error!(exec_id = %exec_id, error = %e, "failed to record skip insight");
                            }
                        }
                        RemediationAction::Rollback => {
                            return Err((ExecutionStatus::RolledBack, decision.rationale));
                        }
                        RemediationAction::PauseExecution
                        | RemediationAction::Terminate
                        | RemediationAction::RetryStage => {
                            return Err((
                                ExecutionStatus::Failed,
                                format!("stage {stage_id} failed: {} ({err})", decision.rationale),
                            ));
                        }
                        RemediationAction::Continue => {}
                    }
                }
            }
        }

        Ok(())
    }

    async fn finalize(
        &self,
        pipeline_id: &PipelineId,
        exec_id: &str,
        mut execution: Execution,
        outcome: Result<(), (ExecutionStatus, String)>,
        heartbeat: HeartbeatLoop,
        holder: LockHolderId,
    ) {
        heartbeat.stop();
        self.inner.active.lock().remove(exec_id);

        let completed_ms = self.inner.clock.epoch_ms();
        let (status, error) = match outcome {
            Ok(()) => (ExecutionStatus::Completed, None),
            Err((status, reason)) => (status, Some(reason)),
        };
        execution.finish(status, completed_ms, error.clone());

        self.inner
            .coordination
            .set_execution_state(
                exec_id,
                status,
                HashMap::new(),
                self.inner.config.default_execution_timeout,
                completed_ms,
            )
            .await;
        self.inner.coordination.release_pipeline(pipeline_id.as_str()).await;

        if let Err(e) = self
            .inner
            .store
            .update_execution_status(
                exec_id,
                status,
                ExecutionStatusUpdate {
                    completed_stages: Some(execution.results.keys().cloned().collect()),
                    current_stage: None,
                    error,
                },
                completed_ms,
            )
            .await
        {
            tracing::error!(exec_id, error = %e, "fatal: could not persist terminal execution state");
        }
        if let Err(e) = self.inner.store.append_log(LogEntry::new(
            ExecutionId::new(exec_id),
            LogLevel::Info,
            format!("execution {status} for pipeline {pipeline_id}"),
            completed_ms,
        )).await {
            tracing::error!(exec_id, error = %e, "failed to append terminal log entry");
        }
        if let Err(e) = self.inner.store.release_lock(pipeline_id).await {
            tracing::error!(exec_id, error = %e, pipeline_id = %pipeline_id, holder = %holder, "failed to release pipeline lock");
        }
    }

    fn active_flags(&self, execution_id: &str) -> Result<Arc<ActiveFlags>, SupervisorError> {
        self.inner
            .active
            .lock()
            .get(execution_id)
            .cloned()
            .ok_or_else(|| SupervisorError::NotFound(execution_id.to_string()))
    }

    /// Looks up persisted status for the not-found/conflict checks the
    /// Trigger API needs (spec.md §4.10): an execution absent from the
    /// active registry has either never existed or already gone terminal,
    /// which the store distinguishes and the registry alone cannot.
    async fn require_execution(&self, execution_id: &str) -> Result<Execution, SupervisorError> {
        self.inner
            .store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| SupervisorError::NotFound(execution_id.to_string()))
    }

    /// Advisory cancel (spec.md §4.8); affects the next stage transition.
    pub async fn cancel(&self, execution_id: &str) -> Result<(), SupervisorError> {
        let execution = self.require_execution(execution_id).await?;
        if execution.status.is_terminal() {
            return Err(SupervisorError::AlreadyTerminal(execution_id.to_string()));
        }
        self.active_flags(execution_id)?
            .cancelled
            .store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn pause(&self, execution_id: &str) -> Result<(), SupervisorError> {
        let execution = self.require_execution(execution_id).await?;
        if execution.status != ExecutionStatus::Running {
            return Err(SupervisorError::NotRunning(execution_id.to_string()));
        }
        self.active_flags(execution_id)?
            .paused
            .store(true, Ordering::SeqCst);
        let now_ms = self.inner.clock.epoch_ms();
        self.inner
            .coordination
            .set_execution_state(
                execution_id,
                ExecutionStatus::Paused,
                HashMap::new(),
                self.inner.config.default_execution_timeout,
                now_ms,
            )
            .await;
        self.inner
            .store
            .update_execution_status(
                execution_id,
                ExecutionStatus::Paused,
                ExecutionStatusUpdate::default(),
                now_ms,
            )
            .await?;
        Ok(())
    }

    pub async fn resume(&self, execution_id: &str) -> Result<(), SupervisorError> {
        let execution = self.require_execution(execution_id).await?;
        if execution.status != ExecutionStatus::Paused {
            return Err(SupervisorError::NotPaused(execution_id.to_string()));
        }
        let flags = self.active_flags(execution_id)?;
        flags.paused.store(false, Ordering::SeqCst);
        let now_ms = self.inner.clock.epoch_ms();
        self.inner
            .coordination
            .set_execution_state(
                execution_id,
                ExecutionStatus::Running,
                HashMap::new(),
                self.inner.config.default_execution_timeout,
                now_ms,
            )
            .await;
        self.inner
            .store
            .update_execution_status(
                execution_id,
                ExecutionStatus::Running,
                ExecutionStatusUpdate::default(),
                now_ms,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
