//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vflow_orchestrator::OrchestratorError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Orchestrator(e) => match e {
                OrchestratorError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
                e if e.is_conflict() => StatusCode::CONFLICT,
                OrchestratorError::InvalidReorder(_) => StatusCode::BAD_REQUEST,
                OrchestratorError::ItemFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OrchestratorError::Stage { .. }
                | OrchestratorError::ClipRender(_)
                | OrchestratorError::Capability(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Orchestrator(OrchestratorError::Busy(_)) => Some("busy"),
            ApiError::Orchestrator(OrchestratorError::AlreadyRunning) => Some("pipeline_running"),
            ApiError::Orchestrator(OrchestratorError::NotReady) => Some("not_ready"),
            ApiError::Orchestrator(OrchestratorError::InvalidReorder(_)) => Some("invalid_reorder"),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").map(|e| e.eq_ignore_ascii_case("production")).unwrap_or(false)
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
