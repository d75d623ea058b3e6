//! Clip rendering for one video, driven by its progress stream.

use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use vflow_models::{ClipProgressEvent, DashboardEvent, ProgressTriple, SoundCue, VideoId};

use crate::engine::Engine;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::metrics;
use crate::stream::decode_events;

/// Keeps clip-render progress sane within one stream.
///
/// `current` is clamped to `total` and the percentage never goes down. A
/// frame that would move progress backwards yields the previous triple.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<ProgressTriple>,
}

impl ProgressTracker {
    pub fn update(&mut self, current: u32, total: u32, reported: Option<f64>) -> ProgressTriple {
        let mut next = ProgressTriple::new(current, total);
        if total == 0 {
            if let Some(pct) = reported {
                next.percentage = pct.clamp(0.0, 100.0).round() as u8;
            }
        }
        // A stale frame republishes the last triple whole.
        if let Some(last) = self.last {
            if next.percentage < last.percentage {
                return last;
            }
        }
        self.last = Some(next);
        next
    }

    /// Final triple at 100%, using the largest total seen.
    pub fn complete(&mut self, current: u32, total: u32) -> ProgressTriple {
        let seen = self.last.map(|p| p.total).unwrap_or(0);
        let done = ProgressTriple::complete(total.max(current).max(seen));
        self.last = Some(done);
        done
    }

    pub fn last(&self) -> Option<ProgressTriple> {
        self.last
    }
}

/// What a clip-render stream reported before it ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClipRenderOutcome {
    pub video_id: VideoId,
    /// Whether the stream delivered its `complete` event.
    pub completed: bool,
    pub scene_errors: usize,
    pub progress: Option<ProgressTriple>,
}

/// Render every clip of one video.
///
/// Refused while a render of the same video is in flight. An `error` event
/// fails the render; `scene_error` events are logged and counted.
pub async fn render_clips_for_video(engine: &Engine, video_id: VideoId) -> OrchestratorResult<ClipRenderOutcome> {
    let _guard = engine.ctx.try_begin_render(&format!("renderClips:{}", video_id))?;

    let body = engine.capabilities().render_clips(video_id).await?;
    let events = decode_events(body);
    futures_util::pin_mut!(events);

    let mut tracker = ProgressTracker::default();
    let mut outcome = ClipRenderOutcome {
        video_id,
        ..Default::default()
    };

    while let Some(event) = events.next().await {
        let event = event?;
        metrics::record_clip_event(event.event_type());
        if let Some((current, total)) = event.counts() {
            debug!(video_id = %video_id, event = event.event_type(), current, total, "Clip event");
        }

        match event {
            ClipProgressEvent::Progress {
                current,
                total,
                percentage,
            } => {
                publish(engine, video_id, tracker.update(current, total, percentage));
            }
            ClipProgressEvent::SceneComplete { current, total, .. } => {
                publish(engine, video_id, tracker.update(current, total, None));
                if let Err(e) = engine.store.refresh_scenes().await {
                    warn!(video_id = %video_id, "Scene refresh after clip failed: {}", e);
                }
            }
            ClipProgressEvent::SceneError {
                current,
                total,
                scene_id,
                message,
            } => {
                publish(engine, video_id, tracker.update(current, total, None));
                let message = message.unwrap_or_else(|| "Clip render failed".to_string());
                warn!(video_id = %video_id, scene_id = ?scene_id, "Scene clip failed: {}", message);
                outcome.scene_errors += 1;
                engine.ctx.emit(DashboardEvent::SceneFailed {
                    video_id,
                    scene_id,
                    message,
                });
            }
            ClipProgressEvent::Complete { current, total } => {
                publish(engine, video_id, tracker.complete(current, total));
                outcome.completed = true;
                engine.refresh_and_report().await?;
                engine.ctx.emit(DashboardEvent::sound(SoundCue::Success));
                break;
            }
            ClipProgressEvent::Error { message } => {
                let message = message.unwrap_or_else(|| "Clip rendering failed".to_string());
                return Err(OrchestratorError::clip_render(message));
            }
        }
    }

    outcome.progress = tracker.last();
    if outcome.completed {
        info!(video_id = %video_id, scene_errors = outcome.scene_errors, "Clips rendered");
    } else {
        warn!(video_id = %video_id, "Clip stream ended without completion");
    }
    Ok(outcome)
}

fn publish(engine: &Engine, video_id: VideoId, progress: ProgressTriple) {
    engine.ctx.set_progress(Some(progress));
    engine.ctx.emit(DashboardEvent::ClipProgress { video_id, progress });
}
