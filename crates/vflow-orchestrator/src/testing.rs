//! In-process fakes for the external collaborators.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use parking_lot::Mutex;

use vflow_capabilities::{
    ByteStream, Capabilities, CapabilityError, CapabilityResult, Notifier, SilenceOptions, SpeechTarget,
    Transcription,
};
use vflow_datastore::InMemoryDataStore;
use vflow_models::{SceneId, SceneItem, VideoId, WorkItem};
use vflow_storage::FileRemover;

use crate::config::OrchestratorConfig;
use crate::engine::{Engine, Services};

/// Capabilities that record every call and answer with predictable URLs.
///
/// Calls are recorded as `"operation:key"`, where the key is the scene or
/// video id (or the URL for `get_duration`). Returned URLs look like
/// `https://cdn.test/<operation>/<key>`.
#[derive(Default)]
pub struct FakeCapabilities {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, bool>>,
    clip_streams: Mutex<HashMap<VideoId, Vec<String>>>,
    durations: Mutex<HashMap<String, f64>>,
    returns_nothing: Mutex<HashSet<&'static str>>,
}

impl FakeCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `operation` for `key` with an ordinary error.
    pub fn fail(&self, operation: &str, key: impl Display) {
        self.failures.lock().insert(format!("{}:{}", operation, key), false);
    }

    /// Fail `operation` for `key` with a fatal error.
    pub fn fail_fatally(&self, operation: &str, key: impl Display) {
        self.failures.lock().insert(format!("{}:{}", operation, key), true);
    }

    /// Chunks `render_clips` streams back for a video. Without one, the
    /// stream is a single `complete` frame.
    pub fn set_clip_stream(&self, video_id: VideoId, chunks: &[&str]) {
        self.clip_streams
            .lock()
            .insert(video_id, chunks.iter().map(|c| c.to_string()).collect());
    }

    pub fn set_duration(&self, url: &str, seconds: f64) {
        self.durations.lock().insert(url.to_string(), seconds);
    }

    /// Make an operation that may return nothing (`improve_sentence`,
    /// `render_scene_video`, captions of `transcribe`) return nothing.
    pub fn return_nothing(&self, operation: &'static str) {
        self.returns_nothing.lock().insert(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Recorded calls of one operation, as keys.
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{}:", operation);
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn url(operation: &str, key: impl Display) -> String {
        format!("https://cdn.test/{}/{}", operation, key)
    }

    fn call(&self, operation: &str, key: impl Display) -> CapabilityResult<()> {
        let entry = format!("{}:{}", operation, key);
        self.calls.lock().push(entry.clone());
        match self.failures.lock().get(&entry).copied() {
            Some(true) => Err(CapabilityError::fatal(format!("{} refused", operation))),
            Some(false) => Err(CapabilityError::request_failed(operation, 500, "injected failure")),
            None => Ok(()),
        }
    }

    fn returns(&self, operation: &str) -> bool {
        !self.returns_nothing.lock().contains(operation)
    }
}

#[async_trait]
impl Capabilities for FakeCapabilities {
    async fn transcribe(&self, media_url: &str, _model_id: &str) -> CapabilityResult<Transcription> {
        self.call("transcribe", media_url)?;
        Ok(Transcription {
            captions_segments: Vec::new(),
            duration_seconds: Some(12.5),
            captions_url: self
                .returns("transcribe")
                .then(|| Self::url("captions", media_url.rsplit('/').next().unwrap_or("media"))),
        })
    }

    async fn generate_scenes(
        &self,
        video_id: VideoId,
        _captions_url: Option<&str>,
        _duration_seconds: Option<f64>,
    ) -> CapabilityResult<()> {
        self.call("generate_scenes", video_id)
    }

    async fn render_clips(&self, video_id: VideoId) -> CapabilityResult<ByteStream> {
        self.call("render_clips", video_id)?;
        let chunks = self
            .clip_streams
            .lock()
            .get(&video_id)
            .cloned()
            .unwrap_or_else(|| vec!["data: {\"type\":\"complete\",\"current\":0,\"total\":0}\n\n".to_string()]);
        let chunks: Vec<CapabilityResult<Bytes>> = chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn normalize_audio(&self, video_id: VideoId, _video_url: &str, _mode: &str) -> CapabilityResult<String> {
        self.call("normalize_audio", video_id)?;
        Ok(Self::url("normalize_audio", video_id))
    }

    async fn convert_to_cfr(&self, video_id: VideoId, _video_url: &str, _framerate: u32) -> CapabilityResult<String> {
        self.call("convert_to_cfr", video_id)?;
        Ok(Self::url("convert_to_cfr", video_id))
    }

    async fn optimize_silence(
        &self,
        video_id: VideoId,
        _video_url: &str,
        _options: &SilenceOptions,
    ) -> CapabilityResult<String> {
        self.call("optimize_silence", video_id)?;
        Ok(Self::url("optimize_silence", video_id))
    }

    async fn improve_sentence(&self, scene_id: SceneId, text: &str, _model_id: &str) -> CapabilityResult<Option<String>> {
        self.call("improve_sentence", scene_id)?;
        Ok(self.returns("improve_sentence").then(|| format!("{} (improved)", text)))
    }

    async fn synthesize_speech(&self, target: SpeechTarget, _text: &str) -> CapabilityResult<String> {
        let key = match target {
            SpeechTarget::Scene(id) => format!("scene-{}", id),
            SpeechTarget::Video(id) => format!("video-{}", id),
        };
        self.call("synthesize_speech", &key)?;
        Ok(Self::url("synthesize_speech", key))
    }

    async fn render_scene_video(
        &self,
        scene_id: SceneId,
        _video_url: &str,
        _audio_url: &str,
    ) -> CapabilityResult<Option<String>> {
        self.call("render_scene_video", scene_id)?;
        Ok(self
            .returns("render_scene_video")
            .then(|| Self::url("render_scene_video", scene_id)))
    }

    async fn concatenate(&self, urls: &[String], _fast_mode: bool) -> CapabilityResult<String> {
        self.call("concatenate", urls.len())?;
        Ok(Self::url("concatenate", urls.len()))
    }

    async fn get_duration(&self, url: &str) -> CapabilityResult<f64> {
        self.call("get_duration", url)?;
        Ok(self.durations.lock().get(url).copied().unwrap_or(60.0))
    }

    async fn speed_up_clip(&self, scene_id: SceneId, _clip_url: &str) -> CapabilityResult<String> {
        self.call("speed_up_clip", scene_id)?;
        Ok(Self::url("speed_up_clip", scene_id))
    }

    async fn audio_to_video(&self, video_id: VideoId, _audio_url: &str) -> CapabilityResult<String> {
        self.call("audio_to_video", video_id)?;
        Ok(Self::url("audio_to_video", video_id))
    }

    async fn generate_scene_prompt(&self, scene_id: SceneId, sentence: &str) -> CapabilityResult<String> {
        self.call("generate_scene_prompt", scene_id)?;
        Ok(format!("cinematic shot: {}", sentence))
    }
}

/// Remembers every URL it was asked to delete.
#[derive(Default)]
pub struct RecordingRemover {
    deleted: Mutex<Vec<String>>,
}

impl RecordingRemover {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl FileRemover for RecordingRemover {
    async fn delete_stored_file(&self, url: &str) -> bool {
        self.deleted.lock().push(url.to_string());
        true
    }
}

/// Remembers every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> CapabilityResult<()> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// An [`Engine`] wired to fakes, with handles to inspect them.
pub struct TestHarness {
    pub engine: Engine,
    pub data: Arc<InMemoryDataStore>,
    pub caps: Arc<FakeCapabilities>,
    pub files: Arc<RecordingRemover>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new(videos: Vec<WorkItem>, scenes: Vec<SceneItem>) -> Self {
        Self::with_config(videos, scenes, OrchestratorConfig::immediate())
    }

    pub fn with_config(videos: Vec<WorkItem>, scenes: Vec<SceneItem>, config: OrchestratorConfig) -> Self {
        let data = Arc::new(InMemoryDataStore::with_items(videos, scenes));
        let caps = Arc::new(FakeCapabilities::new());
        let files = Arc::new(RecordingRemover::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let engine = Engine::new(
            Services {
                data: data.clone(),
                capabilities: caps.clone(),
                files: files.clone(),
                notifier: notifier.clone(),
            },
            config,
        );

        Self {
            engine,
            data,
            caps,
            files,
            notifier,
        }
    }
}
