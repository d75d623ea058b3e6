//! Partial updates sent to the data layer.
//!
//! Only populated fields are serialized, so a patch never clears a column it
//! does not mention.

use serde::{Deserialize, Serialize};

use crate::scene::SceneItem;
use crate::video::{WorkItem, WorkStatus};

/// Partial update of a work item row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfr_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_optimized_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl VideoPatch {
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    pub fn status(status: WorkStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial update of a scene row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sped_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl ScenePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn merge<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if let Some(v) = value {
        *target = Some(v.clone());
    }
}

impl WorkItem {
    /// Apply a patch to the local copy after it was persisted.
    pub fn apply(&mut self, patch: &VideoPatch) {
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        merge(&mut self.order, &patch.order);
        merge(&mut self.video_url, &patch.video_url);
        merge(&mut self.normalized_video_url, &patch.normalized_video_url);
        merge(&mut self.cfr_video_url, &patch.cfr_video_url);
        merge(
            &mut self.silence_optimized_video_url,
            &patch.silence_optimized_video_url,
        );
        merge(&mut self.captions_url, &patch.captions_url);
        merge(&mut self.speech_audio_url, &patch.speech_audio_url);
        merge(&mut self.final_video_url, &patch.final_video_url);
        merge(&mut self.duration_seconds, &patch.duration_seconds);
    }
}

impl SceneItem {
    /// Apply a patch to the local copy after it was persisted.
    pub fn apply(&mut self, patch: &ScenePatch) {
        merge(&mut self.sentence, &patch.sentence);
        merge(&mut self.original_sentence, &patch.original_sentence);
        merge(&mut self.speech_audio_url, &patch.speech_audio_url);
        merge(&mut self.clip_url, &patch.clip_url);
        if let Some(sped_up) = patch.sped_up {
            self.sped_up = sped_up;
        }
        merge(&mut self.synced_video_url, &patch.synced_video_url);
        merge(&mut self.captions_url, &patch.captions_url);
        merge(&mut self.prompt, &patch.prompt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = VideoPatch {
            status: Some(WorkStatus::Done),
            final_video_url: Some("https://cdn.test/final.mp4".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"status": "Done", "final_video_url": "https://cdn.test/final.mp4"})
        );
        assert!(VideoPatch::default().is_empty());
        assert!(!VideoPatch::order(3).is_empty());
    }

    #[test]
    fn test_apply_video_patch_keeps_untouched_fields() {
        let mut item = WorkItem::new(1);
        item.video_url = Some("https://cdn.test/a.mp4".into());
        item.captions_url = Some("https://cdn.test/a.srt".into());

        item.apply(&VideoPatch {
            video_url: Some("https://cdn.test/b.mp4".into()),
            cfr_video_url: Some("https://cdn.test/b.mp4".into()),
            ..Default::default()
        });

        assert_eq!(item.video_url.as_deref(), Some("https://cdn.test/b.mp4"));
        assert_eq!(item.cfr_video_url.as_deref(), Some("https://cdn.test/b.mp4"));
        assert_eq!(item.captions_url.as_deref(), Some("https://cdn.test/a.srt"));
    }

    #[test]
    fn test_apply_scene_patch() {
        let mut scene = SceneItem::new(2, 1);
        scene.apply(&ScenePatch {
            sped_up: Some(true),
            clip_url: Some("https://cdn.test/clip.mp4".into()),
            ..Default::default()
        });
        assert!(scene.sped_up);
        assert_eq!(scene.clip_url.as_deref(), Some("https://cdn.test/clip.mp4"));
        assert!(scene.sentence.is_none());
    }
}
