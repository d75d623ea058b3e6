//! Raw table rows and their conversion into domain items.
//!
//! Artifact columns may hold a URL string, an attachment object or an
//! attachment list. They are resolved here so nothing past this boundary
//! ever sees the raw shapes.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use vflow_models::{resolve_artifact_url, Artifact, SceneItem, WorkItem, WorkStatus};

/// Accept an integer encoded as a JSON number or a numeric string.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accept a boolean encoded as a JSON bool, 0/1 or "true"/"false".
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

fn into_url(artifact: Artifact) -> Option<String> {
    resolve_artifact_url(&artifact).map(str::to_string)
}

/// A row of the videos table.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRow {
    #[serde(alias = "Id")]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub order: Option<i64>,
    #[serde(default)]
    pub video_url: Artifact,
    #[serde(default)]
    pub uploaded_video_url: Artifact,
    #[serde(default)]
    pub normalized_video_url: Artifact,
    #[serde(default)]
    pub cfr_video_url: Artifact,
    #[serde(default)]
    pub silence_optimized_video_url: Artifact,
    #[serde(default)]
    pub captions_url: Artifact,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub speech_audio_url: Artifact,
    #[serde(default)]
    pub final_video_url: Artifact,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl VideoRow {
    pub fn into_item(self) -> WorkItem {
        WorkItem {
            id: self.id.into(),
            title: self.title,
            status: self.status.map(WorkStatus::from).unwrap_or_default(),
            order: self.order,
            video_url: into_url(self.video_url),
            uploaded_video_url: into_url(self.uploaded_video_url),
            normalized_video_url: into_url(self.normalized_video_url),
            cfr_video_url: into_url(self.cfr_video_url),
            silence_optimized_video_url: into_url(self.silence_optimized_video_url),
            captions_url: into_url(self.captions_url),
            script: self.script,
            speech_audio_url: into_url(self.speech_audio_url),
            final_video_url: into_url(self.final_video_url),
            duration_seconds: self.duration_seconds,
        }
    }
}

/// A row of the scenes table.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneRow {
    #[serde(alias = "Id")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub video_id: Option<i64>,
    #[serde(default)]
    pub sentence: Option<String>,
    #[serde(default)]
    pub original_sentence: Option<String>,
    #[serde(default)]
    pub speech_audio_url: Artifact,
    #[serde(default)]
    pub clip_url: Artifact,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub sped_up: bool,
    #[serde(default)]
    pub synced_video_url: Artifact,
    #[serde(default)]
    pub captions_url: Artifact,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl SceneRow {
    /// Convert into a scene. Orphan rows (no parent video) are dropped.
    pub fn into_item(self) -> Option<SceneItem> {
        let video_id = self.video_id?;
        Some(SceneItem {
            id: self.id.into(),
            video_id: video_id.into(),
            sentence: self.sentence,
            original_sentence: self.original_sentence,
            speech_audio_url: into_url(self.speech_audio_url),
            clip_url: into_url(self.clip_url),
            sped_up: self.sped_up,
            synced_video_url: into_url(self.synced_video_url),
            captions_url: into_url(self.captions_url),
            prompt: self.prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vflow_models::{VideoId, VideoSlot};

    #[test]
    fn test_video_row_resolves_artifact_shapes() {
        let row: VideoRow = serde_json::from_value(json!({
            "Id": 3,
            "title": "Intro",
            "status": "processing",
            "order": "2",
            "video_url": [{"title": "a.mp4", "url": "https://cdn.test/a.mp4"}],
            "captions_url": {"signedUrl": "https://cdn.test/a.srt"},
            "final_video_url": "",
            "script": "Hello world"
        }))
        .unwrap();

        let item = row.into_item();
        assert_eq!(item.id, VideoId(3));
        assert_eq!(item.status, WorkStatus::Processing);
        assert_eq!(item.order, Some(2));
        assert_eq!(item.slot(VideoSlot::CurrentVideo), Some("https://cdn.test/a.mp4"));
        assert_eq!(item.slot(VideoSlot::Captions), Some("https://cdn.test/a.srt"));
        assert!(item.final_video_url.is_none());
    }

    #[test]
    fn test_scene_row_lenient_fields() {
        let row: SceneRow = serde_json::from_value(json!({
            "Id": 10,
            "video_id": 3,
            "sentence": "First line",
            "sped_up": 1,
            "clip_url": "https://cdn.test/clip.mp4"
        }))
        .unwrap();

        let scene = row.into_item().unwrap();
        assert!(scene.sped_up);
        assert_eq!(scene.video_id, VideoId(3));
        assert_eq!(scene.clip_url.as_deref(), Some("https://cdn.test/clip.mp4"));
    }

    #[test]
    fn test_orphan_scene_is_dropped() {
        let row: SceneRow = serde_json::from_value(json!({"Id": 1, "sentence": "x"})).unwrap();
        assert!(row.into_item().is_none());
    }
}
