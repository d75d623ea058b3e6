//! Per-video actions: clip rendering, reordering and the catalog merge.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use vflow_models::VideoId;
use vflow_orchestrator::{merge_catalog, render_clips_for_video, ClipRenderOutcome, MergeResult, ReorderCoordinator, ReorderOutcome};

use crate::error::{ApiError, ApiResult};
use crate::handlers::validate;
use crate::state::AppState;

/// Render every clip of one video and wait for the stream to end.
pub async fn render_clips(State(state): State<AppState>, Path(video_id): Path<i64>) -> ApiResult<Json<ClipRenderOutcome>> {
    let engine = &state.engine;
    let video_id = VideoId(video_id);

    if engine.store.video(video_id).is_none() {
        let videos = engine.store.refresh_videos().await?;
        if !videos.iter().any(|v| v.id == video_id) {
            return Err(ApiError::not_found(format!("Video {}", video_id)));
        }
    }

    let outcome = render_clips_for_video(engine, video_id).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest {
    #[validate(range(min = 0))]
    pub dragged_id: i64,
    #[validate(range(min = 0))]
    pub target_id: i64,
}

/// Move one video onto another's position in the presented list.
pub async fn reorder_videos(
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<ReorderOutcome>> {
    validate(&request)?;
    let outcome = ReorderCoordinator::new(&state.engine)
        .reorder_presented(VideoId(request.dragged_id), VideoId(request.target_id))
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct MergeRequest {
    /// Overrides the configured concatenation mode.
    pub fast_mode: Option<bool>,
}

/// Merge every finished video into one file with chapter timestamps.
pub async fn merge_videos(
    State(state): State<AppState>,
    body: Option<Json<MergeRequest>>,
) -> ApiResult<Json<MergeResult>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let engine = &state.engine;
    let fast_mode = request.fast_mode.unwrap_or(engine.config.merge_fast_mode);

    let videos = engine.store.refresh_videos().await?;
    let result = merge_catalog(engine, &videos, fast_mode).await?;
    info!(chapters = result.chapters.len(), url = %result.merged_url, "Catalog merged");
    Ok(Json(result))
}
