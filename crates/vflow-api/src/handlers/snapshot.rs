//! Read-only views of the orchestration state and the cached rows.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vflow_models::{BatchOperationState, SceneItem, StageName, VideoId, WorkItem};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub operations: BatchOperationState,
    pub handlers_ready: bool,
    pub enabled_stages: Vec<StageName>,
}

/// Current in-flight flags, progress and pipeline status.
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let engine = &state.engine;
    Json(StateResponse {
        operations: engine.ctx.snapshot(),
        handlers_ready: engine.ctx.handlers_ready(),
        enabled_stages: engine.config.stages.enabled_stages(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Refetch from the data layer instead of serving the cached snapshot.
    #[serde(default)]
    pub refresh: bool,
    /// Only scenes of this video.
    pub video_id: Option<i64>,
}

/// Videos in presentation order.
pub async fn list_videos(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Json<Vec<WorkItem>>> {
    let store = &state.engine.store;
    let mut videos = store.videos();
    if query.refresh || videos.is_empty() {
        videos = store.refresh_videos().await?;
    }
    Ok(Json(videos))
}

/// Scenes, optionally of a single video.
pub async fn list_scenes(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Json<Vec<SceneItem>>> {
    let store = &state.engine.store;
    if query.refresh || store.scenes().is_empty() {
        store.refresh_scenes().await?;
    }
    let scenes = match query.video_id {
        Some(id) => store.scenes_of(VideoId(id)),
        None => store.scenes(),
    };
    Ok(Json(scenes))
}
