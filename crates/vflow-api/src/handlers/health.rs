//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub handlers: Check,
    pub datastore: Check,
}

/// Outcome of one readiness check.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Check {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        latency_ms: Option<u64>,
    },
    Error {
        error: String,
    },
}

impl Check {
    fn is_ok(&self) -> bool {
        matches!(self, Check::Ok { .. })
    }
}

/// Readiness probe: pipeline handlers wired and the data layer reachable.
///
/// A successful data-layer check also refreshes the video snapshot.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let handlers = if state.engine.ctx.handlers_ready() {
        Check::Ok { latency_ms: None }
    } else {
        Check::Error {
            error: "pipeline handlers not registered".to_string(),
        }
    };

    let start = Instant::now();
    let datastore = match state.engine.store.refresh_videos().await {
        Ok(_) => Check::Ok {
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => Check::Error { error: e.to_string() },
    };

    let all_ok = handlers.is_ok() && datastore.is_ok();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "not_ready" },
        checks: ReadinessChecks { handlers, datastore },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
