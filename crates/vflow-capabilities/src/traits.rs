//! The capability seam.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use vflow_models::{SceneId, VideoId};

use crate::error::CapabilityResult;
use crate::types::{SilenceOptions, SpeechTarget, Transcription};

/// A streamed response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = CapabilityResult<Bytes>> + Send>>;

/// One async method per external operation.
///
/// Implementations never retry; a failed call is reported to the caller,
/// which decides whether it is an item-level or batch-level failure.
#[async_trait]
pub trait Capabilities: Send + Sync {
    /// Transcribe a media file.
    async fn transcribe(&self, media_url: &str, model_id: &str) -> CapabilityResult<Transcription>;

    /// Split a transcribed video into scenes. The service creates the scene rows.
    async fn generate_scenes(
        &self,
        video_id: VideoId,
        captions_url: Option<&str>,
        duration_seconds: Option<f64>,
    ) -> CapabilityResult<()>;

    /// Render every scene clip of a video, reporting progress as a
    /// `data: <json>\n\n` framed byte stream.
    async fn render_clips(&self, video_id: VideoId) -> CapabilityResult<ByteStream>;

    /// Normalize (or enhance) the audio track. Returns the processed file URL.
    async fn normalize_audio(&self, video_id: VideoId, video_url: &str, mode: &str) -> CapabilityResult<String>;

    /// Re-encode to a constant frame rate. Returns the new file URL.
    async fn convert_to_cfr(&self, video_id: VideoId, video_url: &str, framerate: u32) -> CapabilityResult<String>;

    /// Compress silent passages. Returns the new file URL.
    async fn optimize_silence(
        &self,
        video_id: VideoId,
        video_url: &str,
        options: &SilenceOptions,
    ) -> CapabilityResult<String>;

    /// Rewrite a scene sentence. Returns the improved text when the service
    /// hands it back instead of writing it itself.
    async fn improve_sentence(&self, scene_id: SceneId, text: &str, model_id: &str) -> CapabilityResult<Option<String>>;

    /// Synthesize speech for a scene or a whole video. Returns the audio URL.
    async fn synthesize_speech(&self, target: SpeechTarget, text: &str) -> CapabilityResult<String>;

    /// Sync a scene clip with its speech audio. Returns the synced video URL
    /// when the service hands it back instead of writing it itself.
    async fn render_scene_video(
        &self,
        scene_id: SceneId,
        video_url: &str,
        audio_url: &str,
    ) -> CapabilityResult<Option<String>>;

    /// Concatenate videos in the given order. Returns the merged file URL.
    async fn concatenate(&self, urls: &[String], fast_mode: bool) -> CapabilityResult<String>;

    /// Duration of a media file in seconds.
    async fn get_duration(&self, url: &str) -> CapabilityResult<f64>;

    /// Speed up a scene clip. Returns the new clip URL.
    async fn speed_up_clip(&self, scene_id: SceneId, clip_url: &str) -> CapabilityResult<String>;

    /// Turn a speech track into a video. Returns the video URL.
    async fn audio_to_video(&self, video_id: VideoId, audio_url: &str) -> CapabilityResult<String>;

    /// Generate an image/video prompt for a scene sentence.
    async fn generate_scene_prompt(&self, scene_id: SceneId, sentence: &str) -> CapabilityResult<String>;
}
