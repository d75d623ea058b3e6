//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::pipeline::{run_pipeline, run_stage};
use crate::handlers::snapshot::{get_state, list_scenes, list_videos};
use crate::handlers::videos::{merge_videos, render_clips, reorder_videos};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;
use crate::ws::ws_events;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let read_routes = Router::new()
        .route("/state", get(get_state))
        .route("/videos", get(list_videos))
        .route("/scenes", get(list_scenes));

    let action_routes = Router::new()
        .route("/pipeline/run", post(run_pipeline))
        .route("/stages/:stage/run", post(run_stage))
        .route("/videos/:video_id/render-clips", post(render_clips))
        .route("/videos/reorder", post(reorder_videos))
        .route("/videos/merge", post(merge_videos));

    let api_routes = Router::new().merge(read_routes).merge(action_routes);

    let ws_routes = Router::new().route("/ws/events", get(ws_events));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
