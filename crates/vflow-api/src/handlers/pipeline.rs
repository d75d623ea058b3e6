//! Pipeline and "run for all" stage triggers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use vflow_models::{PipelineConfig, StageName};
use vflow_orchestrator::{run_assembly, BatchReport, RunMode};

use crate::error::{ApiError, ApiResult};
use crate::handlers::validate;
use crate::state::AppState;

/// Path name of the assembly batch, which is not a pipeline stage.
pub const ASSEMBLE_STAGE: &str = "assemble";

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RunPipelineRequest {
    /// Stages to run. Omitted means the configured set.
    #[validate(length(min = 1, max = 15))]
    pub stages: Option<Vec<String>>,
}

impl RunPipelineRequest {
    fn to_config(&self, fallback: &PipelineConfig) -> ApiResult<PipelineConfig> {
        let Some(names) = &self.stages else {
            return Ok(fallback.clone());
        };
        let mut config = PipelineConfig::none();
        for name in names {
            let stage: StageName = name.parse().map_err(|e| ApiError::bad_request(format!("{}", e)))?;
            config.set(stage, true);
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
pub struct RunPipelineResponse {
    pub status: &'static str,
    pub stages: Vec<StageName>,
}

/// Start a pipeline run in the background.
///
/// Refused up front when handlers are not ready or a run is in progress;
/// progress is reported over the event stream.
pub async fn run_pipeline(
    State(state): State<AppState>,
    body: Option<Json<RunPipelineRequest>>,
) -> ApiResult<(StatusCode, Json<RunPipelineResponse>)> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    validate(&request)?;
    let config = request.to_config(&state.engine.config.stages)?;

    // The slot is claimed here so a second request is refused even before
    // the spawned run gets scheduled.
    let guard = state.pipeline.begin(&config)?;

    let stages = config.enabled_stages();
    info!(stages = stages.len(), "Pipeline run requested");

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        match pipeline.run_claimed(guard, &config).await {
            Ok(report) => info!(stages_executed = report.stages_executed, "Background pipeline run finished"),
            Err(e) => error!("Background pipeline run failed: {}", e),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunPipelineResponse {
            status: "accepted",
            stages,
        }),
    ))
}

/// Run one stage (or the assembly batch) for every candidate and wait.
pub async fn run_stage(State(state): State<AppState>, Path(stage): Path<String>) -> ApiResult<Json<BatchReport>> {
    if stage.eq_ignore_ascii_case(ASSEMBLE_STAGE) {
        let report = run_assembly(&state.engine, RunMode::Manual).await?;
        return Ok(Json(report));
    }

    let name: StageName = stage
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown stage: {}", stage)))?;
    let report = state.pipeline.run_stage(name).await?;
    Ok(Json(report))
}
