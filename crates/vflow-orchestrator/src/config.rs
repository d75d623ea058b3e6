//! Orchestrator configuration.

use std::time::Duration;

use vflow_capabilities::SilenceOptions;
use vflow_models::PipelineConfig;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between pipeline stages while downstream storage settles
    pub settle_delay: Duration,
    /// Stages enabled for pipeline runs
    pub stages: PipelineConfig,
    /// Model used for video and scene transcription
    pub transcription_model: String,
    /// Model used to rewrite scene sentences
    pub rewrite_model: String,
    /// Audio normalization mode ("normalize" or "enhance")
    pub normalize_mode: String,
    /// Target frame rate of the CFR re-encode
    pub cfr_framerate: u32,
    /// Silence compression options
    pub silence: SilenceOptions,
    /// Concatenate without re-encoding when merging the catalog
    pub merge_fast_mode: bool,
    /// Capacity of the dashboard event channel
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(2000),
            stages: PipelineConfig::all_enabled(),
            transcription_model: "whisper-small".to_string(),
            rewrite_model: "gpt-4o-mini".to_string(),
            normalize_mode: "normalize".to_string(),
            cfr_framerate: 30,
            silence: SilenceOptions::default(),
            merge_fast_mode: false,
            event_buffer: 256,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    ///
    /// Only an unparseable `PIPELINE_STAGES` list is an error; every other
    /// variable falls back to its default.
    pub fn from_env() -> OrchestratorResult<Self> {
        let defaults = Self::default();

        let stages = match std::env::var("PIPELINE_STAGES") {
            Ok(list) => PipelineConfig::parse_list(&list)
                .map_err(|e| OrchestratorError::config_error(format!("PIPELINE_STAGES: {}", e)))?,
            Err(_) => defaults.stages,
        };

        Ok(Self {
            settle_delay: env_parse("PIPELINE_SETTLE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            stages,
            transcription_model: std::env::var("TRANSCRIPTION_MODEL").unwrap_or(defaults.transcription_model),
            rewrite_model: std::env::var("REWRITE_MODEL").unwrap_or(defaults.rewrite_model),
            normalize_mode: std::env::var("NORMALIZE_MODE").unwrap_or(defaults.normalize_mode),
            cfr_framerate: env_parse("CFR_FRAMERATE")
                .filter(|f: &u32| *f > 0)
                .unwrap_or(defaults.cfr_framerate),
            silence: SilenceOptions {
                threshold_db: env_parse("SILENCE_THRESHOLD_DB").unwrap_or(defaults.silence.threshold_db),
                min_silence_ms: env_parse("SILENCE_MIN_MS").unwrap_or(defaults.silence.min_silence_ms),
                padding_ms: env_parse("SILENCE_PADDING_MS").unwrap_or(defaults.silence.padding_ms),
            },
            merge_fast_mode: env_parse("MERGE_FAST_MODE").unwrap_or(defaults.merge_fast_mode),
            event_buffer: env_parse("EVENT_BUFFER_SIZE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.event_buffer),
        })
    }

    /// Config suitable for tests: no settle delay.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}
