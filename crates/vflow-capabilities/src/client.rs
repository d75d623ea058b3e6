//! HTTP implementation of the capability seam.

use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info_span, warn, Instrument};

use vflow_models::{SceneId, VideoId};

use crate::config::CapabilityClientConfig;
use crate::error::{CapabilityError, CapabilityResult};
use crate::traits::{ByteStream, Capabilities};
use crate::types::*;

/// Normalize modes served by the enhancement endpoint instead of plain
/// loudness normalization.
const ENHANCE_MODES: &[&str] = &["enhance", "enhanced", "denoise"];

/// Client for the capability HTTP service.
#[derive(Clone)]
pub struct HttpCapabilityClient {
    http: Client,
    config: CapabilityClientConfig,
}

impl HttpCapabilityClient {
    /// Create a new client.
    pub fn new(config: CapabilityClientConfig) -> CapabilityResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("vflow-capabilities/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(CapabilityError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> CapabilityResult<Self> {
        Self::new(CapabilityClientConfig::from_env())
    }

    pub fn config(&self) -> &CapabilityClientConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url, endpoint)
    }

    /// Check if the service answers its health endpoint.
    pub async fn health_check(&self) -> bool {
        match self.http.get(self.url("health")).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("Capability service health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Capability service health check error: {}", e);
                false
            }
        }
    }

    /// POST a JSON body and return the raw successful response.
    async fn send<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> CapabilityResult<Response> {
        let url = self.url(endpoint);
        let span = info_span!("capability_request", endpoint = %endpoint);

        async {
            let start = Instant::now();
            let response = self.http.post(&url).json(body).send().await?;
            let status = response.status();
            debug!(
                status = status.as_u16(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Capability responded"
            );

            if status.is_success() {
                Ok(response)
            } else {
                Err(Self::error_from_response(endpoint, response).await)
            }
        }
        .instrument(span)
        .await
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> CapabilityResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(endpoint, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CapabilityError::unparsable_body(endpoint, e, &text))
    }

    async fn post_unit<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> CapabilityResult<()> {
        self.send(endpoint, body).await.map(|_| ())
    }

    async fn post_for_url<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> CapabilityResult<String> {
        let response: UrlResponse = self.post_json(endpoint, body).await?;
        response
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CapabilityError::invalid_response(format!("{}: response carried no URL", endpoint)))
    }

    async fn error_from_response(endpoint: &str, response: Response) -> CapabilityError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body.text().map(str::to_string).unwrap_or(text);

        if body.fatal {
            return CapabilityError::Fatal(format!("{}: {}", endpoint, message));
        }
        match status {
            502..=504 => CapabilityError::ServiceUnavailable(format!("{}: {}", endpoint, message)),
            _ => CapabilityError::request_failed(endpoint, status, message),
        }
    }
}

#[async_trait]
impl Capabilities for HttpCapabilityClient {
    async fn transcribe(&self, media_url: &str, model_id: &str) -> CapabilityResult<Transcription> {
        self.post_json("transcribe", &TranscribeRequest { media_url, model_id })
            .await
    }

    async fn generate_scenes(
        &self,
        video_id: VideoId,
        captions_url: Option<&str>,
        duration_seconds: Option<f64>,
    ) -> CapabilityResult<()> {
        let body = GenerateScenesRequest {
            video_id,
            captions_url,
            duration_seconds,
        };
        self.post_unit("generate-scenes", &body).await
    }

    async fn render_clips(&self, video_id: VideoId) -> CapabilityResult<ByteStream> {
        let response = self
            .send("generate-clips", &VideoIdRequest { video_id })
            .await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| CapabilityError::Stream(e.to_string())));
        Ok(Box::pin(stream))
    }

    async fn normalize_audio(&self, video_id: VideoId, video_url: &str, mode: &str) -> CapabilityResult<String> {
        let endpoint = if ENHANCE_MODES.contains(&mode.to_ascii_lowercase().as_str()) {
            "enhance-audio"
        } else {
            "normalize-audio"
        };
        let body = NormalizeRequest {
            video_id,
            video_url,
            mode,
        };
        self.post_for_url(endpoint, &body).await
    }

    async fn convert_to_cfr(&self, video_id: VideoId, video_url: &str, framerate: u32) -> CapabilityResult<String> {
        let body = CfrRequest {
            video_id,
            video_url,
            framerate,
        };
        self.post_for_url("convert-to-cfr", &body).await
    }

    async fn optimize_silence(
        &self,
        video_id: VideoId,
        video_url: &str,
        options: &SilenceOptions,
    ) -> CapabilityResult<String> {
        let body = SilenceRequest {
            video_id,
            video_url,
            options,
        };
        self.post_for_url("optimize-silence", &body).await
    }

    async fn improve_sentence(&self, scene_id: SceneId, text: &str, model_id: &str) -> CapabilityResult<Option<String>> {
        let body = ImproveSentenceRequest {
            scene_id,
            text,
            model_id,
        };
        let response: ImprovedSentenceResponse = self.post_json("improve-sentence", &body).await?;
        Ok(response.text.filter(|t| !t.trim().is_empty()))
    }

    async fn synthesize_speech(&self, target: SpeechTarget, text: &str) -> CapabilityResult<String> {
        self.post_for_url("generate-tts", &SpeechRequest { target, text })
            .await
    }

    async fn render_scene_video(
        &self,
        scene_id: SceneId,
        video_url: &str,
        audio_url: &str,
    ) -> CapabilityResult<Option<String>> {
        let body = SceneVideoRequest {
            scene_id,
            video_url,
            audio_url,
        };
        let response: OptionalUrlResponse = self.post_json("sync-scene-video", &body).await?;
        Ok(response.url.filter(|u| !u.trim().is_empty()))
    }

    async fn concatenate(&self, urls: &[String], fast_mode: bool) -> CapabilityResult<String> {
        self.post_for_url("concatenate-videos", &ConcatenateRequest { urls, fast_mode })
            .await
    }

    async fn get_duration(&self, url: &str) -> CapabilityResult<f64> {
        let response: DurationResponse = self.post_json("get-video-duration", &UrlRequest { url }).await?;
        Ok(response.duration)
    }

    async fn speed_up_clip(&self, scene_id: SceneId, clip_url: &str) -> CapabilityResult<String> {
        self.post_for_url("speed-up-clip", &SpeedUpRequest { scene_id, clip_url })
            .await
    }

    async fn audio_to_video(&self, video_id: VideoId, audio_url: &str) -> CapabilityResult<String> {
        self.post_for_url("audio-to-video", &AudioToVideoRequest { video_id, audio_url })
            .await
    }

    async fn generate_scene_prompt(&self, scene_id: SceneId, sentence: &str) -> CapabilityResult<String> {
        let response: PromptResponse = self
            .post_json("generate-scene-prompt", &ScenePromptRequest { scene_id, sentence })
            .await?;
        Ok(response.prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpCapabilityClient {
        HttpCapabilityClient::new(CapabilityClientConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_convert_to_cfr_returns_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/convert-to-cfr"))
            .and(body_json(json!({"videoId": 3, "videoUrl": "https://cdn.test/3.mp4", "framerate": 30})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cfrUrl": "https://cdn.test/3-cfr.mp4"})))
            .expect(1)
            .mount(&server)
            .await;

        let url = client_for(&server)
            .convert_to_cfr(VideoId(3), "https://cdn.test/3.mp4", 30)
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.test/3-cfr.mp4");
    }

    #[tokio::test]
    async fn test_enhance_mode_uses_enhance_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enhance-audio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"processedUrl": "https://cdn.test/e.mp4"})))
            .expect(1)
            .mount(&server)
            .await;

        let url = client_for(&server)
            .normalize_audio(VideoId(1), "https://cdn.test/1.mp4", "enhance")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.test/e.mp4");
    }

    #[tokio::test]
    async fn test_missing_url_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/optimize-silence"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .optimize_silence(VideoId(1), "https://cdn.test/1.mp4", &SilenceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_error_status_maps_to_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "unsupported codec"})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .transcribe("https://cdn.test/1.mp4", "whisper-small")
            .await
            .unwrap_err();
        match err {
            CapabilityError::RequestFailed { status, message, .. } => {
                assert_eq!(status, 422);
                assert_eq!(message, "unsupported codec");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fatal_flag_maps_to_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-tts"))
            .respond_with(
                ResponseTemplate::new(402).set_body_json(json!({"error": "credits exhausted", "fatal": true})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .synthesize_speech(SpeechTarget::Scene(SceneId(1)), "Hello")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_render_clips_streams_body() {
        let server = MockServer::start().await;
        let body = "data: {\"type\":\"progress\",\"current\":1,\"total\":2}\n\n";
        Mock::given(method("POST"))
            .and(path("/generate-clips"))
            .and(body_json(json!({"videoId": 9})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let stream = client_for(&server).render_clips(VideoId(9)).await.unwrap();
        let chunks: Vec<bytes::Bytes> = stream.try_collect().await.unwrap();
        let joined: Vec<u8> = chunks.concat();
        assert_eq!(String::from_utf8(joined).unwrap(), body);
    }

    #[tokio::test]
    async fn test_get_duration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-video-duration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"duration": 61.5})))
            .mount(&server)
            .await;

        let seconds = client_for(&server).get_duration("https://cdn.test/a.mp4").await.unwrap();
        assert_eq!(seconds, 61.5);
    }

    #[tokio::test]
    async fn test_non_json_body_with_multibyte_text_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-video-duration"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}éé not json", "x".repeat(199))))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_duration("https://cdn.test/a.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidResponse(_)));
        assert!(!err.is_fatal());
    }
}
