//! The pipeline driver.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use vflow_models::{DashboardEvent, PipelineConfig, SoundCue, StageName};

use crate::batch::{BatchReport, RunMode};
use crate::context::PipelineGuard;
use crate::engine::Engine;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::metrics;
use crate::stages::{default_stages, Stage};

/// Summary of a pipeline run that reached the end.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages_executed: usize,
    pub reports: Vec<BatchReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs the enabled stages strictly in order.
///
/// Between two stages the store is refetched and the runner waits for the
/// configured settle delay. The first stage that fails aborts the run;
/// completed stages are not rolled back.
pub struct PipelineOrchestrator {
    engine: Engine,
    stages: Vec<Stage>,
}

impl PipelineOrchestrator {
    /// Wire the full stage table. Marks the pipeline handlers ready.
    pub fn new(engine: Engine) -> Self {
        Self::with_stages(engine, default_stages())
    }

    /// Wire a custom stage table. The handlers are only marked ready when
    /// every stage has one.
    pub fn with_stages(engine: Engine, stages: Vec<Stage>) -> Self {
        if StageName::ALL.iter().all(|name| stages.iter().any(|s| s.name == *name)) {
            engine.ctx.mark_handlers_ready();
        }
        Self { engine, stages }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Claim the pipeline slot for `config` without running anything yet.
    ///
    /// Fails with `NotReady` when an enabled stage has no handler and with
    /// `AlreadyRunning` while another run holds the slot.
    pub fn begin(&self, config: &PipelineConfig) -> OrchestratorResult<PipelineGuard> {
        if let Some(missing) = config
            .enabled_stages()
            .into_iter()
            .find(|name| !self.stages.iter().any(|s| s.name == *name))
        {
            warn!(stage = %missing, "Pipeline refused: stage has no handler");
            return Err(OrchestratorError::NotReady);
        }
        self.engine.ctx.try_begin_pipeline()
    }

    /// Run every stage enabled in `config`.
    pub async fn run(&self, config: &PipelineConfig) -> OrchestratorResult<PipelineReport> {
        let guard = self.begin(config)?;
        self.run_claimed(guard, config).await
    }

    /// Run every stage enabled in `config` on a slot claimed by [`begin`].
    ///
    /// [`begin`]: PipelineOrchestrator::begin
    pub async fn run_claimed(
        &self,
        guard: PipelineGuard,
        config: &PipelineConfig,
    ) -> OrchestratorResult<PipelineReport> {
        let _guard = guard;
        let ctx = &self.engine.ctx;

        let started_at = Utc::now();
        let enabled: Vec<&Stage> = self.stages.iter().filter(|s| config.is_enabled(s.name)).collect();
        info!(
            stages = enabled.len(),
            settle_ms = self.engine.config.settle_delay.as_millis() as u64,
            "Pipeline started"
        );

        let mut reports = Vec::with_capacity(enabled.len());
        for (i, stage) in enabled.iter().enumerate() {
            ctx.set_stage(Some(stage.name));
            ctx.emit(DashboardEvent::StageStarted { stage: stage.name });
            info!(stage = %stage.name, "Stage started");

            let start = Instant::now();
            let result = self.execute(stage).await;
            metrics::record_stage_duration(stage.name.as_str(), start.elapsed().as_secs_f64());

            match result {
                Ok(report) => {
                    info!(
                        stage = %stage.name,
                        attempted = report.attempted,
                        failed = report.failed.len(),
                        "Stage completed"
                    );
                    reports.push(report);
                }
                Err(e) => return Err(self.abort(stage.name, e)),
            }

            let settle = self.engine.config.settle_delay;
            if i + 1 < enabled.len() && !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }
        }

        let stages_executed = reports.len();
        let message = format!("Pipeline succeeded: {} stages executed", stages_executed);
        if let Err(e) = self.engine.notifier().notify(&message).await {
            warn!("Failed to send pipeline notification: {}", e);
        }

        ctx.emit(DashboardEvent::PipelineCompleted { stages_executed });
        ctx.emit(DashboardEvent::sound(SoundCue::Success));
        metrics::record_pipeline_run("success");
        info!(stages_executed, "Pipeline completed");

        Ok(PipelineReport {
            stages_executed,
            reports,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Run a single stage as a "run for all" action.
    pub async fn run_stage(&self, name: StageName) -> OrchestratorResult<BatchReport> {
        let stage = self
            .stages
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| OrchestratorError::config_error(format!("Stage {} is not wired", name)))?;
        (stage.run)(&self.engine, RunMode::Manual).await
    }

    async fn execute(&self, stage: &Stage) -> OrchestratorResult<BatchReport> {
        let report = (stage.run)(&self.engine, RunMode::Pipeline).await?;

        let store = &self.engine.store;
        let videos = store.refresh_videos().await?.len();
        let scenes = if stage.name.touches_scenes() {
            store.refresh_scenes().await?.len()
        } else {
            store.scenes().len()
        };
        self.engine.ctx.emit(DashboardEvent::DataRefreshed { videos, scenes });
        Ok(report)
    }

    fn abort(&self, stage: StageName, source: OrchestratorError) -> OrchestratorError {
        let err = OrchestratorError::stage(stage, &source);
        error!(stage = %stage, "Pipeline aborted: {}", source);

        let ctx = &self.engine.ctx;
        ctx.emit(DashboardEvent::PipelineFailed {
            stage,
            message: source.to_string(),
        });
        ctx.emit(DashboardEvent::error(err.to_string()));
        ctx.emit(DashboardEvent::sound(SoundCue::Failure));
        metrics::record_pipeline_run("failure");
        err
    }
}
