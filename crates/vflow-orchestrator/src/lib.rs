//! Batch and pipeline orchestration.
//!
//! This crate provides:
//! - The injectable orchestration context (in-flight flags, progress, events)
//! - A refreshable snapshot of work items and scenes
//! - The sequential batch runner with per-item failure isolation
//! - The framed progress-stream decoder and per-video clip rendering
//! - The fixed stage table and the pipeline driver
//! - Optimistic reordering, assembly and the catalog merge

pub mod assembly;
pub mod batch;
pub mod clips;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod reorder;
pub mod stages;
pub mod store;
pub mod stream;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use assembly::{assemble_video, format_timestamp, merge_catalog, run_assembly, Chapter, MergeResult};
pub use batch::{BatchItem, BatchOptions, BatchReport, BatchRunner, RunMode};
pub use clips::{render_clips_for_video, ClipRenderOutcome, ProgressTracker};
pub use config::OrchestratorConfig;
pub use context::{OrchestrationContext, PipelineGuard};
pub use engine::{Engine, Services};
pub use error::{OrchestratorError, OrchestratorResult};
pub use logging::BatchLogger;
pub use pipeline::{PipelineOrchestrator, PipelineReport};
pub use reorder::{compute_reorder, ReorderCoordinator, ReorderOutcome};
pub use stages::{default_stages, Stage};
pub use store::WorkItemStore;
pub use stream::{decode_events, FrameDecoder};
