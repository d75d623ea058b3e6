//! Shared data models for the VideoFlow dashboard backend.
//!
//! This crate provides Serde-serializable types for:
//! - Work items (videos) and their scenes
//! - Artifact references and their resolution
//! - Pipeline stage names and configuration
//! - Clip-render progress events and batch state
//! - Dashboard events broadcast to UI clients

pub mod artifact;
pub mod events;
pub mod patch;
pub mod pipeline;
pub mod progress;
pub mod scene;
pub mod video;

// Re-export common types
pub use artifact::{resolve_artifact_url, Artifact};
pub use events::{DashboardEvent, SoundCue};
pub use patch::{ScenePatch, VideoPatch};
pub use pipeline::{ParseStageError, PipelineConfig, StageName};
pub use progress::{BatchOperationState, ClipProgressEvent, ProgressTriple};
pub use scene::{SceneId, SceneItem, SceneSlot};
pub use video::{sort_by_order, VideoId, VideoSlot, WorkItem, WorkStatus};
