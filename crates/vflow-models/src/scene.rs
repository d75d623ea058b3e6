//! Scene (sub-item) models.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoId;

/// Stable integer identifier of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub i64);

impl SceneId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SceneId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Named artifact slots of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneSlot {
    Sentence,
    OriginalSentence,
    SpeechAudio,
    Clip,
    SyncedVideo,
    Captions,
    Prompt,
}

/// A scene belonging to exactly one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneItem {
    pub id: SceneId,

    /// Parent work item.
    pub video_id: VideoId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,

    /// The sentence before it was rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_sentence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_audio_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_url: Option<String>,

    /// Whether the rendered clip has already been sped up.
    #[serde(default)]
    pub sped_up: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl SceneItem {
    pub fn new(id: impl Into<SceneId>, video_id: impl Into<VideoId>) -> Self {
        Self {
            id: id.into(),
            video_id: video_id.into(),
            ..Default::default()
        }
    }

    /// Get the value held in a slot, ignoring blank strings.
    pub fn slot(&self, slot: SceneSlot) -> Option<&str> {
        let value = match slot {
            SceneSlot::Sentence => &self.sentence,
            SceneSlot::OriginalSentence => &self.original_sentence,
            SceneSlot::SpeechAudio => &self.speech_audio_url,
            SceneSlot::Clip => &self.clip_url,
            SceneSlot::SyncedVideo => &self.synced_video_url,
            SceneSlot::Captions => &self.captions_url,
            SceneSlot::Prompt => &self.prompt,
        };
        value.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn has(&self, slot: SceneSlot) -> bool {
        self.slot(slot).is_some()
    }

    /// A scene with no usable sentence.
    pub fn is_empty(&self) -> bool {
        !self.has(SceneSlot::Sentence)
    }
}
