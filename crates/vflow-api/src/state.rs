//! Application state.

use std::sync::Arc;

use vflow_orchestrator::{Engine, OrchestratorConfig, OrchestratorResult, PipelineOrchestrator, Services};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub engine: Engine,
    pub pipeline: Arc<PipelineOrchestrator>,
}

impl AppState {
    /// Wrap an engine. Building the pipeline marks its handlers ready.
    pub fn new(config: ApiConfig, engine: Engine) -> Self {
        let pipeline = Arc::new(PipelineOrchestrator::new(engine.clone()));
        Self {
            config: Arc::new(config),
            engine,
            pipeline,
        }
    }

    /// Build the state from environment variables.
    pub fn from_env(config: ApiConfig) -> OrchestratorResult<Self> {
        let engine = Engine::new(Services::from_env()?, OrchestratorConfig::from_env()?);
        Ok(Self::new(config, engine))
    }
}
