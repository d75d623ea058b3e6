//! One-shot pipeline run.
//!
//! Loads configuration from the environment, runs every enabled stage once
//! and exits non-zero if a stage aborted the run.

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vflow_orchestrator::{Engine, OrchestratorConfig, PipelineOrchestrator, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    let env_filter = EnvFilter::from_default_env().add_directive("vflow=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting vflow-pipeline");

    let config = OrchestratorConfig::from_env().context("invalid orchestrator configuration")?;
    info!(stages = ?config.stages.enabled_stages(), "Pipeline config loaded");

    let services = Services::from_env().context("failed to build service clients")?;
    let stages = config.stages.clone();
    let engine = Engine::new(services, config);
    let pipeline = PipelineOrchestrator::new(engine);

    let run = tokio::select! {
        result = pipeline.run(&stages) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
            return Ok(());
        }
    };

    match run {
        Ok(report) => {
            info!(
                stages_executed = report.stages_executed,
                duration_secs = (report.finished_at - report.started_at).num_seconds(),
                "Pipeline run finished"
            );
            Ok(())
        }
        Err(e) => {
            error!("Pipeline run failed: {}", e);
            Err(e.into())
        }
    }
}
