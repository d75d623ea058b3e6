//! The fixed pipeline stages.
//!
//! Each stage is a `(name, run)` record. `run` loads its candidates from a
//! fresh store snapshot, filters out items whose target slot is already
//! populated and hands the rest to a [`BatchRunner`]. Re-running a stage
//! after it succeeded therefore processes nothing.

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use tracing::debug;

use vflow_capabilities::SpeechTarget;
use vflow_models::{SceneItem, ScenePatch, SceneSlot, StageName, VideoPatch, VideoSlot, WorkItem};

use crate::batch::{BatchOptions, BatchReport, BatchRunner, RunMode};
use crate::clips::render_clips_for_video;
use crate::engine::Engine;
use crate::error::{OrchestratorError, OrchestratorResult};

pub type StageFuture<'a> = BoxFuture<'a, OrchestratorResult<BatchReport>>;

/// Runs one stage against an engine.
pub type StageFn = for<'a> fn(&'a Engine, RunMode) -> StageFuture<'a>;

#[derive(Clone, Copy)]
pub struct Stage {
    pub name: StageName,
    pub run: StageFn,
}

impl Stage {
    pub fn new(name: StageName, run: StageFn) -> Self {
        Self { name, run }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// All stages in execution order.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new(StageName::TtsFromScript, tts_from_script),
        Stage::new(StageName::TtsToVideo, tts_to_video),
        Stage::new(StageName::NormalizeAudio, normalize_audio),
        Stage::new(StageName::ConvertToCfr, convert_to_cfr),
        Stage::new(StageName::OptimizeSilence, optimize_silence),
        Stage::new(StageName::Transcribe, transcribe),
        Stage::new(StageName::GenerateScenes, generate_scenes),
        Stage::new(StageName::DeleteEmptyScenes, delete_empty_scenes),
        Stage::new(StageName::GenerateClips, generate_clips),
        Stage::new(StageName::SpeedUp, speed_up),
        Stage::new(StageName::ImproveText, improve_text),
        Stage::new(StageName::GenerateSpeech, generate_speech),
        Stage::new(StageName::SyncVideo, sync_video),
        Stage::new(StageName::TranscribeScenes, transcribe_scenes),
        Stage::new(StageName::PromptScenes, prompt_scenes),
    ]
}

// =============================================================================
// Drivers
// =============================================================================

type VideoFilter = fn(&Engine, &WorkItem) -> bool;
type SceneFilter = fn(&SceneItem) -> bool;

async fn load_videos(engine: &Engine, with_scenes: bool, keep: VideoFilter) -> OrchestratorResult<Vec<WorkItem>> {
    if with_scenes {
        engine.store.refresh_scenes().await?;
    }
    let videos = engine.store.refresh_videos().await?;
    Ok(videos.into_iter().filter(|v| keep(engine, v)).collect())
}

async fn load_scenes(engine: &Engine, keep: SceneFilter) -> OrchestratorResult<Vec<SceneItem>> {
    let scenes = engine.store.refresh_scenes().await?;
    Ok(scenes.into_iter().filter(|s| keep(s)).collect())
}

async fn video_stage<F, Fut>(
    engine: &Engine,
    mode: RunMode,
    stage: StageName,
    with_scenes: bool,
    keep: VideoFilter,
    op: F,
) -> OrchestratorResult<BatchReport>
where
    F: FnMut(WorkItem) -> Fut,
    Fut: Future<Output = OrchestratorResult<()>>,
{
    let opts = BatchOptions::new(stage.as_str(), mode);
    BatchRunner::new(&engine.ctx)
        .with_store(&engine.store)
        .run_loaded(&opts, load_videos(engine, with_scenes, keep), op)
        .await
}

async fn scene_stage<F, Fut>(
    engine: &Engine,
    mode: RunMode,
    stage: StageName,
    keep: SceneFilter,
    op: F,
) -> OrchestratorResult<BatchReport>
where
    F: FnMut(SceneItem) -> Fut,
    Fut: Future<Output = OrchestratorResult<()>>,
{
    let opts = BatchOptions::new(stage.as_str(), mode);
    BatchRunner::new(&engine.ctx)
        .with_store(&engine.store)
        .run_loaded(&opts, load_scenes(engine, keep), op)
        .await
}

fn require<'a>(value: Option<&'a str>, what: &str) -> OrchestratorResult<&'a str> {
    value.ok_or_else(|| OrchestratorError::item_failed(format!("missing {}", what)))
}

fn processing_with_video(video: &WorkItem) -> bool {
    video.status.is_processing() && video.has(VideoSlot::CurrentVideo)
}

/// Persist a new current video, then drop the file it replaced.
async fn replace_current(engine: &Engine, video: &WorkItem, old_url: &str, patch: VideoPatch) -> OrchestratorResult<()> {
    let new_url = patch.video_url.clone().unwrap_or_default();
    engine.data().update_video(video.id, &patch).await?;
    engine.supersede(video, Some(old_url), &new_url).await;
    Ok(())
}

// =============================================================================
// Video stages
// =============================================================================

fn tts_from_script(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::TtsFromScript,
        false,
        |_, v| v.has(VideoSlot::Script) && !v.has(VideoSlot::SpeechAudio),
        move |video| async move {
            let script = require(video.slot(VideoSlot::Script), "script")?;
            let audio_url = engine
                .capabilities()
                .synthesize_speech(SpeechTarget::Video(video.id), script)
                .await?;
            let patch = VideoPatch {
                speech_audio_url: Some(audio_url),
                ..Default::default()
            };
            engine.data().update_video(video.id, &patch).await?;
            Ok(())
        },
    ))
}

fn tts_to_video(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::TtsToVideo,
        false,
        |_, v| v.has(VideoSlot::SpeechAudio) && !v.has(VideoSlot::CurrentVideo),
        move |video| async move {
            let audio_url = require(video.slot(VideoSlot::SpeechAudio), "speech audio")?;
            let video_url = engine.capabilities().audio_to_video(video.id, audio_url).await?;
            let patch = VideoPatch {
                video_url: Some(video_url),
                ..Default::default()
            };
            engine.data().update_video(video.id, &patch).await?;
            Ok(())
        },
    ))
}

fn normalize_audio(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::NormalizeAudio,
        false,
        |_, v| processing_with_video(v) && !v.has(VideoSlot::NormalizedVideo),
        move |video| async move {
            let current = require(video.slot(VideoSlot::CurrentVideo), "video")?;
            let url = engine
                .capabilities()
                .normalize_audio(video.id, current, &engine.config.normalize_mode)
                .await?;
            let patch = VideoPatch {
                normalized_video_url: Some(url.clone()),
                video_url: Some(url),
                ..Default::default()
            };
            replace_current(engine, &video, current, patch).await
        },
    ))
}

fn convert_to_cfr(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::ConvertToCfr,
        false,
        |_, v| processing_with_video(v) && !v.has(VideoSlot::CfrVideo),
        move |video| async move {
            let current = require(video.slot(VideoSlot::CurrentVideo), "video")?;
            let url = engine
                .capabilities()
                .convert_to_cfr(video.id, current, engine.config.cfr_framerate)
                .await?;
            let patch = VideoPatch {
                cfr_video_url: Some(url.clone()),
                video_url: Some(url),
                ..Default::default()
            };
            replace_current(engine, &video, current, patch).await
        },
    ))
}

fn optimize_silence(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::OptimizeSilence,
        false,
        |_, v| processing_with_video(v) && !v.has(VideoSlot::SilenceOptimizedVideo),
        move |video| async move {
            let current = require(video.slot(VideoSlot::CurrentVideo), "video")?;
            let url = engine
                .capabilities()
                .optimize_silence(video.id, current, &engine.config.silence)
                .await?;
            let patch = VideoPatch {
                silence_optimized_video_url: Some(url.clone()),
                video_url: Some(url),
                ..Default::default()
            };
            replace_current(engine, &video, current, patch).await
        },
    ))
}

fn transcribe(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::Transcribe,
        false,
        |_, v| processing_with_video(v) && !v.has(VideoSlot::Captions),
        move |video| async move {
            let current = require(video.slot(VideoSlot::CurrentVideo), "video")?;
            let transcription = engine
                .capabilities()
                .transcribe(current, &engine.config.transcription_model)
                .await?;
            let captions_url = transcription
                .captions_url
                .ok_or_else(|| OrchestratorError::item_failed("transcription returned no captions file"))?;
            let patch = VideoPatch {
                captions_url: Some(captions_url),
                duration_seconds: transcription.duration_seconds,
                ..Default::default()
            };
            engine.data().update_video(video.id, &patch).await?;
            Ok(())
        },
    ))
}

fn generate_scenes(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::GenerateScenes,
        true,
        |engine, v| {
            v.status.is_processing() && v.has(VideoSlot::Captions) && engine.store.scenes_of(v.id).is_empty()
        },
        move |video| async move {
            engine
                .capabilities()
                .generate_scenes(video.id, video.slot(VideoSlot::Captions), video.duration_seconds)
                .await?;
            Ok(())
        },
    ))
}

fn generate_clips(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(video_stage(
        engine,
        mode,
        StageName::GenerateClips,
        true,
        |engine, v| {
            let scenes = engine.store.scenes_of(v.id);
            v.status.is_processing() && !scenes.is_empty() && scenes.iter().any(|s| !s.has(SceneSlot::Clip))
        },
        move |video| async move {
            render_clips_for_video(engine, video.id).await?;
            Ok(())
        },
    ))
}

// =============================================================================
// Scene stages
// =============================================================================

fn delete_empty_scenes(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::DeleteEmptyScenes,
        |s| s.is_empty(),
        move |scene| async move {
            engine.data().delete_scene(scene.id).await?;
            Ok(())
        },
    ))
}

fn speed_up(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::SpeedUp,
        |s| s.has(SceneSlot::Clip) && !s.sped_up,
        move |scene| async move {
            let clip_url = require(scene.slot(SceneSlot::Clip), "clip")?;
            let new_url = engine.capabilities().speed_up_clip(scene.id, clip_url).await?;
            let patch = ScenePatch {
                clip_url: Some(new_url.clone()),
                sped_up: Some(true),
                ..Default::default()
            };
            engine.data().update_scene(scene.id, &patch).await?;
            if new_url != clip_url {
                engine.files().delete_stored_file(clip_url).await;
            }
            Ok(())
        },
    ))
}

fn improve_text(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::ImproveText,
        |s| s.has(SceneSlot::Sentence) && !s.has(SceneSlot::OriginalSentence),
        move |scene| async move {
            let sentence = require(scene.slot(SceneSlot::Sentence), "sentence")?;
            let improved = engine
                .capabilities()
                .improve_sentence(scene.id, sentence, &engine.config.rewrite_model)
                .await?;
            if improved.is_none() {
                debug!(scene_id = %scene.id, "Sentence rewritten by the service");
            }
            let patch = ScenePatch {
                original_sentence: Some(sentence.to_string()),
                sentence: improved,
                ..Default::default()
            };
            engine.data().update_scene(scene.id, &patch).await?;
            Ok(())
        },
    ))
}

fn generate_speech(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::GenerateSpeech,
        |s| s.has(SceneSlot::Sentence) && !s.has(SceneSlot::SpeechAudio),
        move |scene| async move {
            let sentence = require(scene.slot(SceneSlot::Sentence), "sentence")?;
            let audio_url = engine
                .capabilities()
                .synthesize_speech(SpeechTarget::Scene(scene.id), sentence)
                .await?;
            let patch = ScenePatch {
                speech_audio_url: Some(audio_url),
                ..Default::default()
            };
            engine.data().update_scene(scene.id, &patch).await?;
            Ok(())
        },
    ))
}

fn sync_video(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::SyncVideo,
        |s| s.has(SceneSlot::Clip) && s.has(SceneSlot::SpeechAudio) && !s.has(SceneSlot::SyncedVideo),
        move |scene| async move {
            let clip_url = require(scene.slot(SceneSlot::Clip), "clip")?;
            let audio_url = require(scene.slot(SceneSlot::SpeechAudio), "speech audio")?;
            let synced = engine
                .capabilities()
                .render_scene_video(scene.id, clip_url, audio_url)
                .await?;
            match synced {
                Some(url) => {
                    let patch = ScenePatch {
                        synced_video_url: Some(url),
                        ..Default::default()
                    };
                    engine.data().update_scene(scene.id, &patch).await?;
                }
                None => debug!(scene_id = %scene.id, "Synced video stored by the service"),
            }
            Ok(())
        },
    ))
}

fn transcribe_scenes(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::TranscribeScenes,
        |s| s.has(SceneSlot::SyncedVideo) && !s.has(SceneSlot::Captions),
        move |scene| async move {
            let synced = require(scene.slot(SceneSlot::SyncedVideo), "synced video")?;
            let transcription = engine
                .capabilities()
                .transcribe(synced, &engine.config.transcription_model)
                .await?;
            let captions_url = transcription
                .captions_url
                .ok_or_else(|| OrchestratorError::item_failed("transcription returned no captions file"))?;
            let patch = ScenePatch {
                captions_url: Some(captions_url),
                ..Default::default()
            };
            engine.data().update_scene(scene.id, &patch).await?;
            Ok(())
        },
    ))
}

fn prompt_scenes(engine: &Engine, mode: RunMode) -> StageFuture<'_> {
    Box::pin(scene_stage(
        engine,
        mode,
        StageName::PromptScenes,
        |s| s.has(SceneSlot::Sentence) && !s.has(SceneSlot::Prompt),
        move |scene| async move {
            let sentence = require(scene.slot(SceneSlot::Sentence), "sentence")?;
            let prompt = engine.capabilities().generate_scene_prompt(scene.id, sentence).await?;
            let patch = ScenePatch {
                prompt: Some(prompt),
                ..Default::default()
            };
            engine.data().update_scene(scene.id, &patch).await?;
            Ok(())
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCapabilities, TestHarness};
    use vflow_models::{SceneId, VideoId, WorkStatus};

    fn processing(id: i64, url: &str) -> WorkItem {
        let mut video = WorkItem::new(id);
        video.status = WorkStatus::Processing;
        video.video_url = Some(url.to_string());
        video
    }

    fn scene(id: i64, video_id: i64, sentence: &str) -> SceneItem {
        let mut scene = SceneItem::new(id, video_id);
        scene.sentence = Some(sentence.to_string());
        scene
    }

    async fn run(harness: &TestHarness, name: StageName) -> OrchestratorResult<BatchReport> {
        let stage = default_stages()
            .into_iter()
            .find(|s| s.name == name)
            .expect("stage exists");
        (stage.run)(&harness.engine, RunMode::Pipeline).await
    }

    #[test]
    fn test_stage_table_follows_execution_order() {
        let names: Vec<StageName> = default_stages().iter().map(|s| s.name).collect();
        assert_eq!(names, StageName::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_rerun_processes_nothing() {
        let harness = TestHarness::new(vec![processing(1, "https://cdn.test/a.mp4")], vec![]);

        let first = run(&harness, StageName::NormalizeAudio).await.unwrap();
        assert_eq!(first.attempted, 1);

        let second = run(&harness, StageName::NormalizeAudio).await.unwrap();
        assert_eq!(second.attempted, 0);
        assert_eq!(harness.caps.calls_to("normalize_audio"), vec!["1"]);
    }

    #[tokio::test]
    async fn test_only_processing_videos_are_candidates() {
        let mut pending = processing(2, "https://cdn.test/b.mp4");
        pending.status = WorkStatus::Pending;
        let harness = TestHarness::new(vec![processing(1, "https://cdn.test/a.mp4"), pending], vec![]);

        let report = run(&harness, StageName::ConvertToCfr).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(harness.caps.calls_to("convert_to_cfr"), vec!["1"]);
    }

    #[tokio::test]
    async fn test_replacing_video_deletes_superseded_file_but_not_upload() {
        let mut original = processing(1, "https://cdn.test/upload-1.mp4");
        original.uploaded_video_url = Some("https://cdn.test/upload-1.mp4".into());
        let derived = processing(2, "https://cdn.test/cfr-2.mp4");
        let harness = TestHarness::new(vec![original, derived], vec![]);

        run(&harness, StageName::OptimizeSilence).await.unwrap();

        let expected = FakeCapabilities::url("optimize_silence", 1);
        let video = harness.data.video(VideoId(1)).unwrap();
        assert_eq!(video.video_url.as_deref(), Some(expected.as_str()));
        assert_eq!(video.silence_optimized_video_url.as_deref(), Some(expected.as_str()));
        assert_eq!(video.uploaded_video_url.as_deref(), Some("https://cdn.test/upload-1.mp4"));
        assert_eq!(harness.files.deleted(), vec!["https://cdn.test/cfr-2.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_item_failure_is_isolated() {
        let harness = TestHarness::new(
            vec![
                processing(1, "https://cdn.test/1.mp4"),
                processing(2, "https://cdn.test/2.mp4"),
                processing(3, "https://cdn.test/3.mp4"),
            ],
            vec![],
        );
        harness.caps.fail("transcribe", "https://cdn.test/2.mp4");

        let report = run(&harness, StageName::Transcribe).await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert!(harness.data.video(VideoId(3)).unwrap().captions_url.is_some());
        assert!(harness.data.video(VideoId(2)).unwrap().captions_url.is_none());
    }

    #[tokio::test]
    async fn test_missing_captions_fails_the_item() {
        let harness = TestHarness::new(vec![processing(1, "https://cdn.test/1.mp4")], vec![]);
        harness.caps.return_nothing("transcribe");

        let report = run(&harness, StageName::Transcribe).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("no captions"));
    }

    #[tokio::test]
    async fn test_fatal_capability_error_fails_stage() {
        let harness = TestHarness::new(vec![processing(1, "https://cdn.test/1.mp4")], vec![]);
        harness.caps.fail_fatally("normalize_audio", 1);

        let err = run(&harness, StageName::NormalizeAudio).await.unwrap_err();
        assert!(err.is_stage_fatal());
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_stage() {
        let harness = TestHarness::new(vec![processing(1, "https://cdn.test/1.mp4")], vec![]);
        harness.data.set_fail_fetches(true);

        assert!(run(&harness, StageName::Transcribe).await.is_err());
        assert!(harness.caps.calls().is_empty());
    }

    #[tokio::test]
    async fn test_script_to_speech_to_video() {
        let mut scripted = WorkItem::new(1);
        scripted.script = Some("Hello world".into());
        let harness = TestHarness::new(vec![scripted], vec![]);

        run(&harness, StageName::TtsFromScript).await.unwrap();
        run(&harness, StageName::TtsToVideo).await.unwrap();

        let video = harness.data.video(VideoId(1)).unwrap();
        assert_eq!(
            video.speech_audio_url,
            Some(FakeCapabilities::url("synthesize_speech", "video-1"))
        );
        assert_eq!(video.video_url, Some(FakeCapabilities::url("audio_to_video", 1)));
    }

    #[tokio::test]
    async fn test_generate_scenes_skips_videos_with_scenes() {
        let mut with_scenes = processing(1, "https://cdn.test/1.mp4");
        with_scenes.captions_url = Some("https://cdn.test/1.srt".into());
        let mut without = processing(2, "https://cdn.test/2.mp4");
        without.captions_url = Some("https://cdn.test/2.srt".into());
        let harness = TestHarness::new(vec![with_scenes, without], vec![scene(10, 1, "Intro")]);

        let report = run(&harness, StageName::GenerateScenes).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(harness.caps.calls_to("generate_scenes"), vec!["2"]);
    }

    #[tokio::test]
    async fn test_delete_empty_scenes() {
        let harness = TestHarness::new(
            vec![WorkItem::new(1)],
            vec![scene(10, 1, "Keep me"), scene(11, 1, "   "), SceneItem::new(12, 1)],
        );

        let report = run(&harness, StageName::DeleteEmptyScenes).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert!(harness.data.scene(SceneId(10)).is_some());
        assert!(harness.data.scene(SceneId(11)).is_none());
        assert!(harness.data.scene(SceneId(12)).is_none());
    }

    #[tokio::test]
    async fn test_generate_clips_renders_videos_missing_clips() {
        let mut done = scene(10, 1, "One");
        done.clip_url = Some("https://cdn.test/clip-10.mp4".into());
        let harness = TestHarness::new(
            vec![processing(1, "https://cdn.test/1.mp4"), processing(2, "https://cdn.test/2.mp4")],
            vec![done, scene(20, 2, "Two")],
        );

        let report = run(&harness, StageName::GenerateClips).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(harness.caps.calls_to("render_clips"), vec!["2"]);
    }

    #[tokio::test]
    async fn test_speed_up_replaces_clip_once() {
        let mut clipped = scene(10, 1, "One");
        clipped.clip_url = Some("https://cdn.test/clip-10.mp4".into());
        let harness = TestHarness::new(vec![WorkItem::new(1)], vec![clipped]);

        run(&harness, StageName::SpeedUp).await.unwrap();
        let again = run(&harness, StageName::SpeedUp).await.unwrap();

        assert_eq!(again.attempted, 0);
        let scene = harness.data.scene(SceneId(10)).unwrap();
        assert!(scene.sped_up);
        assert_eq!(scene.clip_url, Some(FakeCapabilities::url("speed_up_clip", 10)));
        assert_eq!(harness.files.deleted(), vec!["https://cdn.test/clip-10.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_improve_text_keeps_original() {
        let harness = TestHarness::new(vec![WorkItem::new(1)], vec![scene(10, 1, "Raw text")]);

        run(&harness, StageName::ImproveText).await.unwrap();

        let scene = harness.data.scene(SceneId(10)).unwrap();
        assert_eq!(scene.original_sentence.as_deref(), Some("Raw text"));
        assert_eq!(scene.sentence.as_deref(), Some("Raw text (improved)"));
        assert_eq!(run(&harness, StageName::ImproveText).await.unwrap().attempted, 0);
    }

    #[tokio::test]
    async fn test_scene_chain_through_prompts() {
        let mut clipped = scene(10, 1, "One");
        clipped.clip_url = Some("https://cdn.test/clip-10.mp4".into());
        let harness = TestHarness::new(vec![WorkItem::new(1)], vec![clipped]);

        for stage in [
            StageName::GenerateSpeech,
            StageName::SyncVideo,
            StageName::TranscribeScenes,
            StageName::PromptScenes,
        ] {
            let report = run(&harness, stage).await.unwrap();
            assert_eq!(report.attempted, 1, "{}", stage);
            assert!(report.failed.is_empty(), "{}", stage);
        }

        let scene = harness.data.scene(SceneId(10)).unwrap();
        assert!(scene.speech_audio_url.is_some());
        assert_eq!(scene.synced_video_url, Some(FakeCapabilities::url("render_scene_video", 10)));
        assert!(scene.captions_url.is_some());
        assert_eq!(scene.prompt.as_deref(), Some("cinematic shot: One"));
    }

    #[tokio::test]
    async fn test_sync_without_returned_url_writes_nothing() {
        let mut ready = scene(10, 1, "One");
        ready.clip_url = Some("https://cdn.test/clip.mp4".into());
        ready.speech_audio_url = Some("https://cdn.test/audio.wav".into());
        let harness = TestHarness::new(vec![WorkItem::new(1)], vec![ready]);
        harness.caps.return_nothing("render_scene_video");

        let report = run(&harness, StageName::SyncVideo).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert!(harness.data.scene_updates().is_empty());
    }
}
