//! Capability request/response types.
//!
//! The services speak camelCase JSON; snake_case aliases are accepted on
//! responses.

use serde::{Deserialize, Serialize};

use vflow_models::{SceneId, VideoId};

/// One caption segment produced by transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Result of a transcription call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    #[serde(default, alias = "captions_segments", alias = "segments")]
    pub captions_segments: Vec<CaptionSegment>,
    #[serde(default, alias = "duration_seconds", alias = "duration")]
    pub duration_seconds: Option<f64>,
    /// Where the service stored the captions file, if it did.
    #[serde(default, alias = "captions_url")]
    pub captions_url: Option<String>,
}

/// Silence compression options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceOptions {
    /// Loudness below which audio counts as silence.
    pub threshold_db: f64,
    /// Shortest silence worth compressing.
    pub min_silence_ms: u64,
    /// Silence kept around speech.
    pub padding_ms: u64,
}

impl Default for SilenceOptions {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            min_silence_ms: 500,
            padding_ms: 150,
        }
    }
}

/// What a synthesized speech track belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeechTarget {
    #[serde(rename = "sceneId")]
    Scene(SceneId),
    #[serde(rename = "videoId")]
    Video(VideoId),
}

// =============================================================================
// Wire requests
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranscribeRequest<'a> {
    pub media_url: &'a str,
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateScenesRequest<'a> {
    pub video_id: VideoId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoIdRequest {
    pub video_id: VideoId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NormalizeRequest<'a> {
    pub video_id: VideoId,
    pub video_url: &'a str,
    pub mode: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CfrRequest<'a> {
    pub video_id: VideoId,
    pub video_url: &'a str,
    pub framerate: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SilenceRequest<'a> {
    pub video_id: VideoId,
    pub video_url: &'a str,
    #[serde(flatten)]
    pub options: &'a SilenceOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImproveSentenceRequest<'a> {
    pub scene_id: SceneId,
    pub text: &'a str,
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeechRequest<'a> {
    #[serde(flatten)]
    pub target: SpeechTarget,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneVideoRequest<'a> {
    pub scene_id: SceneId,
    pub video_url: &'a str,
    pub audio_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConcatenateRequest<'a> {
    pub urls: &'a [String],
    pub fast_mode: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UrlRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpeedUpRequest<'a> {
    pub scene_id: SceneId,
    pub clip_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AudioToVideoRequest<'a> {
    pub video_id: VideoId,
    pub audio_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScenePromptRequest<'a> {
    pub scene_id: SceneId,
    pub sentence: &'a str,
}

// =============================================================================
// Wire responses
// =============================================================================

/// Any response carrying a produced file URL.
///
/// Each endpoint names the field differently; all known names are accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct UrlResponse {
    #[serde(
        default,
        alias = "processedUrl",
        alias = "cfrUrl",
        alias = "optimizedUrl",
        alias = "audioUrl",
        alias = "mergedUrl",
        alias = "videoUrl",
        alias = "clipUrl",
        alias = "syncedVideoUrl"
    )]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionalUrlResponse {
    #[serde(default, alias = "syncedVideoUrl", alias = "videoUrl")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImprovedSentenceResponse {
    #[serde(default, alias = "improvedText", alias = "sentence")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DurationResponse {
    #[serde(alias = "durationSeconds", alias = "duration_seconds")]
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromptResponse {
    pub prompt: String,
}

/// Error body a service may return.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub fatal: bool,
}

impl ErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .or(self.detail.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transcription_accepts_both_spellings() {
        let a: Transcription = serde_json::from_value(json!({
            "captionsSegments": [{"start": 0.0, "end": 1.5, "text": "Hello"}],
            "durationSeconds": 12.5,
            "captionsUrl": "https://cdn.test/1.srt"
        }))
        .unwrap();
        let b: Transcription = serde_json::from_value(json!({
            "segments": [{"start": 0.0, "end": 1.5, "text": "Hello"}],
            "duration": 12.5,
            "captions_url": "https://cdn.test/1.srt"
        }))
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.duration_seconds, Some(12.5));
    }

    #[test]
    fn test_speech_request_target_shape() {
        let body = SpeechRequest {
            target: SpeechTarget::Scene(SceneId(4)),
            text: "Hi",
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"sceneId": 4, "text": "Hi"}));

        let body = SpeechRequest {
            target: SpeechTarget::Video(VideoId(2)),
            text: "Hi",
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"videoId": 2, "text": "Hi"}));
    }

    #[test]
    fn test_url_response_aliases() {
        let r: UrlResponse = serde_json::from_value(json!({"cfrUrl": "https://cdn.test/c.mp4"})).unwrap();
        assert_eq!(r.url.as_deref(), Some("https://cdn.test/c.mp4"));
        let r: UrlResponse = serde_json::from_value(json!({"mergedUrl": "https://cdn.test/m.mp4"})).unwrap();
        assert_eq!(r.url.as_deref(), Some("https://cdn.test/m.mp4"));
    }

    #[test]
    fn test_silence_request_flattens_options() {
        let options = SilenceOptions::default();
        let body = SilenceRequest {
            video_id: VideoId(1),
            video_url: "https://cdn.test/a.mp4",
            options: &options,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "videoId": 1,
                "videoUrl": "https://cdn.test/a.mp4",
                "thresholdDb": -40.0,
                "minSilenceMs": 500,
                "paddingMs": 150
            })
        );
    }
}
