//! Orchestrator error types.

use thiserror::Error;

use vflow_capabilities::CapabilityError;
use vflow_datastore::DataStoreError;
use vflow_models::StageName;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A batch with the same name is already in flight.
    #[error("Already running: {0}")]
    Busy(String),

    #[error("Pipeline handlers are not ready")]
    NotReady,

    #[error("A pipeline run is already in progress")]
    AlreadyRunning,

    /// A stage aborted the pipeline.
    #[error("Stage {stage} failed: {message}")]
    Stage { stage: StageName, message: String },

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    #[error("Clip render failed: {0}")]
    ClipRender(String),

    #[error("Item failed: {0}")]
    ItemFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data layer error: {0}")]
    DataStore(#[from] DataStoreError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
}

impl OrchestratorError {
    pub fn busy(name: impl Into<String>) -> Self {
        Self::Busy(name.into())
    }

    pub fn invalid_reorder(msg: impl Into<String>) -> Self {
        Self::InvalidReorder(msg.into())
    }

    pub fn clip_render(msg: impl Into<String>) -> Self {
        Self::ClipRender(msg.into())
    }

    pub fn item_failed(msg: impl Into<String>) -> Self {
        Self::ItemFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Wrap an error with the stage it aborted.
    pub fn stage(stage: StageName, source: &OrchestratorError) -> Self {
        Self::Stage {
            stage,
            message: source.to_string(),
        }
    }

    /// Per-item errors that must abort the surrounding batch instead of
    /// being absorbed.
    pub fn is_stage_fatal(&self) -> bool {
        matches!(self, Self::Capability(e) if e.is_fatal())
    }

    /// Errors caused by a concurrent run rather than by the work itself.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::AlreadyRunning | Self::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fatal_capability_errors_abort() {
        assert!(OrchestratorError::from(CapabilityError::fatal("quota")).is_stage_fatal());
        assert!(!OrchestratorError::from(CapabilityError::invalid_response("x")).is_stage_fatal());
        assert!(!OrchestratorError::item_failed("bad file").is_stage_fatal());
        assert!(!OrchestratorError::from(DataStoreError::request_failed("x")).is_stage_fatal());
    }

    #[test]
    fn test_stage_wrapping_names_stage() {
        let err = OrchestratorError::stage(
            StageName::SpeedUp,
            &OrchestratorError::from(DataStoreError::request_failed("list failed")),
        );
        let text = err.to_string();
        assert!(text.starts_with("Stage speedUp failed"));
        assert!(text.contains("list failed"));
    }
}
