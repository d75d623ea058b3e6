//! Events broadcast to dashboard clients.

use serde::{Deserialize, Serialize};

use crate::pipeline::StageName;
use crate::progress::ProgressTriple;
use crate::video::VideoId;

/// Audible cue the UI plays on completion or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Success,
    Failure,
}

/// A state change published by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    BatchStarted {
        batch: String,
        total: usize,
    },
    ItemStarted {
        batch: String,
        item_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video_id: Option<VideoId>,
    },
    ItemFailed {
        batch: String,
        item_id: i64,
        message: String,
    },
    BatchFinished {
        batch: String,
        attempted: usize,
        failed: usize,
    },
    ClipProgress {
        video_id: VideoId,
        progress: ProgressTriple,
    },
    SceneFailed {
        video_id: VideoId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scene_id: Option<i64>,
        message: String,
    },
    StageStarted {
        stage: StageName,
    },
    PipelineCompleted {
        stages_executed: usize,
    },
    PipelineFailed {
        stage: StageName,
        message: String,
    },
    DataRefreshed {
        videos: usize,
        scenes: usize,
    },
    OrderChanged {
        /// `(video id, order)` pairs in the new presentation order.
        orders: Vec<(VideoId, i64)>,
    },
    Sound {
        cue: SoundCue,
    },
    Error {
        message: String,
    },
}

impl DashboardEvent {
    pub fn error(message: impl Into<String>) -> Self {
        DashboardEvent::Error {
            message: message.into(),
        }
    }

    pub fn sound(cue: SoundCue) -> Self {
        DashboardEvent::Sound { cue }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_shape() {
        let event = DashboardEvent::PipelineFailed {
            stage: StageName::ConvertToCfr,
            message: "fetch failed".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "pipeline_failed", "stage": "convertToCFR", "message": "fetch failed"})
        );

        let sound = DashboardEvent::sound(SoundCue::Success);
        assert_eq!(
            serde_json::to_value(&sound).unwrap(),
            json!({"type": "sound", "cue": "success"})
        );
    }
}
