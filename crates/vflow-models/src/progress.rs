//! Clip-render progress events and shared batch state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pipeline::StageName;
use crate::video::VideoId;

/// Sub-progress of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressTriple {
    pub current: u32,
    pub total: u32,
    pub percentage: u8,
}

impl ProgressTriple {
    /// Build a triple, clamping `current` to `total` and deriving the
    /// percentage as `round(100 * current / total)`.
    pub fn new(current: u32, total: u32) -> Self {
        let current = current.min(total);
        let percentage = if total == 0 {
            0
        } else {
            ((100.0 * current as f64) / total as f64).round() as u8
        };
        Self {
            current,
            total,
            percentage,
        }
    }

    /// A finished triple at 100%.
    pub fn complete(total: u32) -> Self {
        Self {
            current: total,
            total,
            percentage: 100,
        }
    }
}

/// One event decoded from a clip-render stream.
///
/// Payload fields are lenient: the server may omit any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClipProgressEvent {
    Progress {
        #[serde(default)]
        current: u32,
        #[serde(default)]
        total: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percentage: Option<f64>,
    },
    SceneComplete {
        #[serde(default)]
        current: u32,
        #[serde(default)]
        total: u32,
        #[serde(default, alias = "sceneId", skip_serializing_if = "Option::is_none")]
        scene_id: Option<i64>,
    },
    SceneError {
        #[serde(default)]
        current: u32,
        #[serde(default)]
        total: u32,
        #[serde(default, alias = "sceneId", skip_serializing_if = "Option::is_none")]
        scene_id: Option<i64>,
        #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Complete {
        #[serde(default)]
        current: u32,
        #[serde(default)]
        total: u32,
    },
    Error {
        #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ClipProgressEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ClipProgressEvent::Progress { .. } => "progress",
            ClipProgressEvent::SceneComplete { .. } => "scene_complete",
            ClipProgressEvent::SceneError { .. } => "scene_error",
            ClipProgressEvent::Complete { .. } => "complete",
            ClipProgressEvent::Error { .. } => "error",
        }
    }

    /// `(current, total)` carried by the event, if any.
    pub fn counts(&self) -> Option<(u32, u32)> {
        match self {
            ClipProgressEvent::Progress { current, total, .. }
            | ClipProgressEvent::SceneComplete { current, total, .. }
            | ClipProgressEvent::SceneError { current, total, .. }
            | ClipProgressEvent::Complete { current, total } => Some((*current, *total)),
            ClipProgressEvent::Error { .. } => None,
        }
    }
}

/// Snapshot of the shared orchestration state, as shown to UI clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchOperationState {
    /// Batch name to in-flight flag.
    pub in_flight: BTreeMap<String, bool>,

    /// Entity currently being processed (a video or scene id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item_id: Option<i64>,

    /// Parent video of the entity currently being processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_video_id: Option<VideoId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressTriple>,

    #[serde(default)]
    pub pipeline_running: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,
}

impl BatchOperationState {
    pub fn is_in_flight(&self, batch: &str) -> bool {
        self.in_flight.get(batch).copied().unwrap_or(false)
    }
}
