//! Per-video assembly and the catalog merge.

use serde::Serialize;
use tracing::{error, info, warn};

use vflow_models::{
    sort_by_order, DashboardEvent, SceneSlot, SoundCue, VideoPatch, VideoSlot, WorkItem, WorkStatus,
};

use crate::batch::{BatchOptions, BatchReport, BatchRunner, RunMode};
use crate::engine::Engine;
use crate::error::{OrchestratorError, OrchestratorResult};

/// Batch name of [`run_assembly`].
pub const ASSEMBLE_BATCH: &str = "assemble";

/// In-flight name of [`merge_catalog`].
pub const MERGE_BATCH: &str = "merge";

/// Concatenate a video's synced scene videos into its final video and
/// mark it done. Returns the final URL.
pub async fn assemble_video(engine: &Engine, video: &WorkItem) -> OrchestratorResult<String> {
    let mut scenes = engine.store.scenes_of(video.id);
    if scenes.is_empty() {
        return Err(OrchestratorError::item_failed(format!("video {} has no scenes", video.id)));
    }
    scenes.sort_by_key(|s| s.id);

    let urls = scenes
        .iter()
        .map(|s| {
            s.slot(SceneSlot::SyncedVideo)
                .map(str::to_string)
                .ok_or_else(|| OrchestratorError::item_failed(format!("scene {} is not synced", s.id)))
        })
        .collect::<OrchestratorResult<Vec<_>>>()?;

    let final_url = engine
        .capabilities()
        .concatenate(&urls, engine.config.merge_fast_mode)
        .await?;

    let patch = VideoPatch {
        final_video_url: Some(final_url.clone()),
        status: Some(WorkStatus::Done),
        ..Default::default()
    };
    engine.data().update_video(video.id, &patch).await?;
    info!(video_id = %video.id, scenes = urls.len(), "Video assembled");
    Ok(final_url)
}

/// Assemble every processing video whose scenes are all synced.
pub async fn run_assembly(engine: &Engine, mode: RunMode) -> OrchestratorResult<BatchReport> {
    let opts = BatchOptions::new(ASSEMBLE_BATCH, mode);
    BatchRunner::new(&engine.ctx)
        .with_store(&engine.store)
        .run_loaded(&opts, assembly_candidates(engine), move |video| async move {
            assemble_video(engine, &video).await?;
            Ok(())
        })
        .await
}

async fn assembly_candidates(engine: &Engine) -> OrchestratorResult<Vec<WorkItem>> {
    engine.store.refresh_scenes().await?;
    let videos = engine.store.refresh_videos().await?;
    Ok(videos
        .into_iter()
        .filter(|v| {
            let scenes = engine.store.scenes_of(v.id);
            v.status.is_processing()
                && !v.has(VideoSlot::FinalVideo)
                && !scenes.is_empty()
                && scenes.iter().all(|s| s.has(SceneSlot::SyncedVideo))
        })
        .collect())
}

// =============================================================================
// Catalog merge
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub start_seconds: f64,
    pub timestamp: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeResult {
    pub merged_url: String,
    pub chapters: Vec<Chapter>,
    pub total_seconds: f64,
    /// One `timestamp title` line per chapter.
    pub description: String,
}

/// Format seconds as `MM:SS`, or `H:MM:SS` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Chapters with cumulative start times for `(title, duration)` pairs.
pub fn build_chapters(entries: &[(String, f64)]) -> Vec<Chapter> {
    let mut start = 0.0;
    entries
        .iter()
        .map(|(title, duration)| {
            let chapter = Chapter {
                start_seconds: start,
                timestamp: format_timestamp(start),
                title: title.clone(),
            };
            start += duration.max(0.0);
            chapter
        })
        .collect()
}

/// Merge every finished video, in presentation order, into one file.
///
/// Done videos without a playable URL are skipped with a warning. A failed
/// merge is reported on the event stream with the failure sound.
pub async fn merge_catalog(engine: &Engine, videos: &[WorkItem], fast_mode: bool) -> OrchestratorResult<MergeResult> {
    let _guard = engine.ctx.try_begin_batch(MERGE_BATCH)?;

    match merge_finished(engine, videos, fast_mode).await {
        Ok(result) => {
            info!(chapters = result.chapters.len(), total_seconds = result.total_seconds, "Catalog merged");
            engine.ctx.emit(DashboardEvent::sound(SoundCue::Success));
            Ok(result)
        }
        Err(e) => {
            error!("Catalog merge failed: {}", e);
            engine.ctx.emit(DashboardEvent::error(format!("Merge failed: {}", e)));
            engine.ctx.emit(DashboardEvent::sound(SoundCue::Failure));
            Err(e)
        }
    }
}

async fn merge_finished(engine: &Engine, videos: &[WorkItem], fast_mode: bool) -> OrchestratorResult<MergeResult> {
    let mut done: Vec<WorkItem> = videos
        .iter()
        .filter(|v| v.status == WorkStatus::Done)
        .cloned()
        .collect();
    sort_by_order(&mut done);

    let mut urls = Vec::new();
    let mut entries = Vec::new();
    for video in &done {
        let Some(url) = video.playable_url() else {
            warn!(video_id = %video.id, "Finished video has no playable URL, skipping");
            continue;
        };
        engine.ctx.set_current(video.id.get(), Some(video.id));
        let duration = engine.capabilities().get_duration(url).await?;
        urls.push(url.to_string());
        entries.push((video.display_title(), duration));
    }

    if urls.is_empty() {
        return Err(OrchestratorError::item_failed("no finished videos to merge"));
    }

    let merged_url = engine.capabilities().concatenate(&urls, fast_mode).await?;
    let chapters = build_chapters(&entries);
    let total_seconds: f64 = entries.iter().map(|(_, d)| d.max(0.0)).sum();
    let description = chapters
        .iter()
        .map(|c| format!("{} {}", c.timestamp, c.title))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(MergeResult {
        merged_url,
        chapters,
        total_seconds,
        description,
    })
}
