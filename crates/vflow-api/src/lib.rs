//! Axum control API for the VideoFlow dashboard.
//!
//! This crate provides:
//! - Triggers for pipeline runs, single stages, clip renders, reorders and merges
//! - Read-only snapshots of the orchestration state and cached rows
//! - A WebSocket stream of dashboard events
//! - Health, readiness and Prometheus endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
