//! Work item (video) models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable integer identifier of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub i64);

impl VideoId {
    /// Get the raw integer id.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VideoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Processing status of a work item.
///
/// The data layer stores a free-form string; the three known values are
/// matched case-insensitively and anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum WorkStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Other(String),
}

impl WorkStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkStatus::Pending => "Pending",
            WorkStatus::Processing => "Processing",
            WorkStatus::Done => "Done",
            WorkStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, WorkStatus::Processing)
    }
}

impl From<String> for WorkStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => WorkStatus::Pending,
            "processing" => WorkStatus::Processing,
            "done" => WorkStatus::Done,
            _ => WorkStatus::Other(s),
        }
    }
}

impl From<&str> for WorkStatus {
    fn from(s: &str) -> Self {
        WorkStatus::from(s.to_string())
    }
}

impl From<WorkStatus> for String {
    fn from(status: WorkStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named artifact slots of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoSlot {
    /// Canonical "current video" URL, replaced by video-producing stages.
    CurrentVideo,
    /// The originally uploaded video. Never deleted from storage.
    UploadedVideo,
    NormalizedVideo,
    CfrVideo,
    SilenceOptimizedVideo,
    Captions,
    Script,
    SpeechAudio,
    FinalVideo,
}

/// A top-level media record flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkItem {
    pub id: VideoId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub status: WorkStatus,

    /// Presentation and merge order. Absent means "use the id".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfr_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_optimized_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_audio_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl WorkItem {
    /// Create an empty pending work item.
    pub fn new(id: impl Into<VideoId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Get the value held in a slot, ignoring blank strings.
    pub fn slot(&self, slot: VideoSlot) -> Option<&str> {
        match slot {
            VideoSlot::CurrentVideo => non_blank(&self.video_url),
            VideoSlot::UploadedVideo => non_blank(&self.uploaded_video_url),
            VideoSlot::NormalizedVideo => non_blank(&self.normalized_video_url),
            VideoSlot::CfrVideo => non_blank(&self.cfr_video_url),
            VideoSlot::SilenceOptimizedVideo => non_blank(&self.silence_optimized_video_url),
            VideoSlot::Captions => non_blank(&self.captions_url),
            VideoSlot::Script => non_blank(&self.script),
            VideoSlot::SpeechAudio => non_blank(&self.speech_audio_url),
            VideoSlot::FinalVideo => non_blank(&self.final_video_url),
        }
    }

    /// Check whether a slot is populated.
    pub fn has(&self, slot: VideoSlot) -> bool {
        self.slot(slot).is_some()
    }

    /// Order used for presentation and merging (falls back to the id).
    pub fn effective_order(&self) -> i64 {
        self.order.unwrap_or(self.id.0)
    }

    /// Best URL to play this item: the final video, else the current one.
    pub fn playable_url(&self) -> Option<&str> {
        self.slot(VideoSlot::FinalVideo)
            .or_else(|| self.slot(VideoSlot::CurrentVideo))
    }

    /// Human label for logs and chapter titles.
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Video {}", self.id))
    }

    /// Check whether `url` is the original upload of this item.
    pub fn is_original_upload(&self, url: &str) -> bool {
        self.slot(VideoSlot::UploadedVideo) == Some(url)
    }
}

/// Sort work items into presentation order.
pub fn sort_by_order(items: &mut [WorkItem]) {
    items.sort_by_key(|item| (item.effective_order(), item.id));
}
