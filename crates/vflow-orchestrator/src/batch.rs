//! Sequential batch execution with per-item failure isolation.

use std::future::Future;

use serde::Serialize;
use tracing::{warn, Instrument};

use vflow_models::{DashboardEvent, SceneItem, SoundCue, VideoId, WorkItem};

use crate::context::OrchestrationContext;
use crate::error::OrchestratorResult;
use crate::logging::BatchLogger;
use crate::metrics;
use crate::store::WorkItemStore;

/// An entity a batch can iterate over.
pub trait BatchItem {
    /// Id shown as "currently processing".
    fn item_id(&self) -> i64;

    /// Parent video, when the entity is a sub-item.
    fn video_id(&self) -> Option<VideoId>;
}

impl BatchItem for WorkItem {
    fn item_id(&self) -> i64 {
        self.id.get()
    }

    fn video_id(&self) -> Option<VideoId> {
        Some(self.id)
    }
}

impl BatchItem for SceneItem {
    fn item_id(&self) -> i64 {
        self.id.get()
    }

    fn video_id(&self) -> Option<VideoId> {
        Some(self.video_id)
    }
}

/// Who started a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One stage of a pipeline run. The orchestrator handles refresh and cues.
    Pipeline,
    /// A "run for all" action. The batch refreshes and plays its own cues.
    Manual,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Pipeline => "pipeline",
            RunMode::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub name: String,
    pub mode: RunMode,
    /// Refetch the store after the last item.
    pub refresh_after: bool,
    /// Emit a success cue after the last item.
    pub sound: bool,
}

impl BatchOptions {
    pub fn new(name: impl Into<String>, mode: RunMode) -> Self {
        let manual = mode == RunMode::Manual;
        Self {
            name: name.into(),
            mode,
            refresh_after: manual,
            sound: manual,
        }
    }
}

/// Outcome of a batch that ran to the end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub name: String,
    pub attempted: usize,
    /// `(item id, message)` for every item whose operation failed.
    pub failed: Vec<(i64, String)>,
}

impl BatchReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempted: 0,
            failed: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// Runs one operation over a list of entities, strictly one at a time.
pub struct BatchRunner<'a> {
    ctx: &'a OrchestrationContext,
    store: Option<&'a WorkItemStore>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(ctx: &'a OrchestrationContext) -> Self {
        Self { ctx, store: None }
    }

    /// Store to refresh when [`BatchOptions::refresh_after`] is set.
    pub fn with_store(mut self, store: &'a WorkItemStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Run `op` over an already filtered, ordered list.
    pub async fn run<T, F, Fut>(&self, opts: &BatchOptions, items: Vec<T>, op: F) -> OrchestratorResult<BatchReport>
    where
        T: BatchItem,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = OrchestratorResult<()>>,
    {
        self.run_loaded(opts, async move { Ok(items) }, op).await
    }

    /// Load the candidates, then run `op` over them.
    ///
    /// A load failure, or an operation failing with a stage-fatal error,
    /// fails the whole batch. Any other per-item error is logged and the
    /// next item runs. Every item is attempted exactly once.
    pub async fn run_loaded<T, L, F, Fut>(&self, opts: &BatchOptions, load: L, op: F) -> OrchestratorResult<BatchReport>
    where
        T: BatchItem,
        L: Future<Output = OrchestratorResult<Vec<T>>>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = OrchestratorResult<()>>,
    {
        let logger = BatchLogger::new(&opts.name, opts.mode.as_str());
        let span = logger.create_span();

        let result = async {
            let guard = self.ctx.try_begin_batch(&opts.name)?;
            let report = self.iterate(&logger, load, op).await;
            drop(guard);
            let report = report?;

            if opts.refresh_after {
                if let Some(store) = self.store {
                    let (videos, scenes) = store.refresh().await?;
                    self.ctx.emit(DashboardEvent::DataRefreshed { videos, scenes });
                }
            }
            if opts.sound {
                self.ctx.emit(DashboardEvent::sound(SoundCue::Success));
            }
            Ok(report)
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            if opts.mode == RunMode::Manual {
                self.ctx.emit(DashboardEvent::error(format!("{} failed: {}", opts.name, e)));
                self.ctx.emit(DashboardEvent::sound(SoundCue::Failure));
            }
        }
        result
    }

    async fn iterate<T, L, F, Fut>(&self, logger: &BatchLogger, load: L, mut op: F) -> OrchestratorResult<BatchReport>
    where
        T: BatchItem,
        L: Future<Output = OrchestratorResult<Vec<T>>>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = OrchestratorResult<()>>,
    {
        let name = logger.batch();
        let items = match load.await {
            Ok(items) => items,
            Err(e) => {
                logger.log_aborted(&e.to_string());
                metrics::record_batch_abort(name);
                return Err(e);
            }
        };

        logger.log_start(items.len());
        self.ctx.emit(DashboardEvent::BatchStarted {
            batch: name.to_string(),
            total: items.len(),
        });

        let mut report = BatchReport::new(name);
        for item in items {
            let item_id = item.item_id();
            self.ctx.set_current(item_id, item.video_id());
            self.ctx.emit(DashboardEvent::ItemStarted {
                batch: name.to_string(),
                item_id,
                video_id: item.video_id(),
            });

            report.attempted += 1;
            match op(item).await {
                Ok(()) => metrics::record_batch_item(name, true),
                Err(e) if e.is_stage_fatal() => {
                    logger.log_aborted(&e.to_string());
                    metrics::record_batch_item(name, false);
                    metrics::record_batch_abort(name);
                    return Err(e);
                }
                Err(e) => {
                    let message = e.to_string();
                    logger.log_item_failure(item_id, &message);
                    metrics::record_batch_item(name, false);
                    self.ctx.emit(DashboardEvent::ItemFailed {
                        batch: name.to_string(),
                        item_id,
                        message: message.clone(),
                    });
                    report.failed.push((item_id, message));
                }
            }
        }

        self.ctx.clear_current();
        logger.log_completion(report.attempted, report.failed.len());
        if !report.failed.is_empty() {
            warn!(batch = %name, failed = report.failed.len(), "Batch finished with failures");
        }
        self.ctx.emit(DashboardEvent::BatchFinished {
            batch: name.to_string(),
            attempted: report.attempted,
            failed: report.failed.len(),
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use vflow_capabilities::CapabilityError;
    use vflow_datastore::InMemoryDataStore;

    use crate::error::OrchestratorError;

    fn videos(ids: &[i64]) -> Vec<WorkItem> {
        ids.iter().map(|id| WorkItem::new(*id)).collect()
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<DashboardEvent>) -> Vec<DashboardEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_failing_item_does_not_stop_batch() {
        let ctx = OrchestrationContext::new(64);
        let seen = Mutex::new(Vec::new());
        let opts = BatchOptions::new("transcribe", RunMode::Pipeline);

        let report = BatchRunner::new(&ctx)
            .run(&opts, videos(&[1, 2, 3, 4]), |video| {
                seen.lock().push(video.id.get());
                async move {
                    if video.id.get() == 2 {
                        Err(OrchestratorError::item_failed("corrupt file"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![1, 2, 3, 4]);
        assert_eq!(report.attempted, 4);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert!(!ctx.is_in_flight("transcribe"));
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_batch() {
        let ctx = OrchestrationContext::new(64);
        let seen = Mutex::new(Vec::new());
        let opts = BatchOptions::new("speedUp", RunMode::Pipeline);

        let result = BatchRunner::new(&ctx)
            .run(&opts, videos(&[1, 2, 3]), |video| {
                seen.lock().push(video.id.get());
                async move {
                    if video.id.get() == 2 {
                        Err(OrchestratorError::from(CapabilityError::fatal("quota exhausted")))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.unwrap_err().is_stage_fatal());
        assert_eq!(*seen.lock(), vec![1, 2]);
        let state = ctx.snapshot();
        assert!(!state.is_in_flight("speedUp"));
        assert!(state.current_item_id.is_none());
    }

    #[tokio::test]
    async fn test_load_failure_propagates() {
        let ctx = OrchestrationContext::new(64);
        let opts = BatchOptions::new("normalizeAudio", RunMode::Pipeline);

        let result = BatchRunner::new(&ctx)
            .run_loaded(
                &opts,
                async { Err::<Vec<WorkItem>, _>(OrchestratorError::item_failed("list failed")) },
                |_video| async { Ok(()) },
            )
            .await;

        assert!(result.is_err());
        assert!(!ctx.is_in_flight("normalizeAudio"));
    }

    #[tokio::test]
    async fn test_empty_batch_clears_stale_marker() {
        let ctx = OrchestrationContext::new(64);
        ctx.set_current(9, Some(VideoId(9)));
        let opts = BatchOptions::new("promptScenes", RunMode::Pipeline);

        let report = BatchRunner::new(&ctx)
            .run(&opts, Vec::<SceneItem>::new(), |_scene| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(report.attempted, 0);
        assert!(ctx.snapshot().current_item_id.is_none());
    }

    #[tokio::test]
    async fn test_same_batch_is_refused_while_in_flight() {
        let ctx = OrchestrationContext::new(64);
        let _guard = ctx.try_begin_batch("transcribe").unwrap();
        let opts = BatchOptions::new("transcribe", RunMode::Pipeline);

        let result = BatchRunner::new(&ctx)
            .run(&opts, videos(&[1]), |_video| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(OrchestratorError::Busy(_))));
    }

    #[tokio::test]
    async fn test_manual_batch_refreshes_and_plays_cue() {
        let ctx = OrchestrationContext::new(64);
        let data = Arc::new(InMemoryDataStore::with_items(videos(&[1, 2]), vec![]));
        let store = WorkItemStore::new(data);
        let mut rx = ctx.subscribe();
        let opts = BatchOptions::new("assemble", RunMode::Manual);

        BatchRunner::new(&ctx)
            .with_store(&store)
            .run(&opts, videos(&[1]), |_video| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(store.videos().len(), 2);
        let events = drain(&mut rx);
        assert!(events.contains(&DashboardEvent::DataRefreshed { videos: 2, scenes: 0 }));
        assert_eq!(events.last(), Some(&DashboardEvent::sound(SoundCue::Success)));
    }

    #[tokio::test]
    async fn test_manual_batch_failure_plays_failure_cue() {
        let ctx = OrchestrationContext::new(64);
        let mut rx = ctx.subscribe();
        let opts = BatchOptions::new("assemble", RunMode::Manual);

        let result = BatchRunner::new(&ctx)
            .run(&opts, videos(&[1]), |_video| async {
                Err(OrchestratorError::from(CapabilityError::fatal("disk full")))
            })
            .await;

        assert!(result.is_err());
        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&DashboardEvent::sound(SoundCue::Failure)));
        assert!(events.iter().any(|e| matches!(e, DashboardEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_item_events_carry_parent_video() {
        let ctx = OrchestrationContext::new(64);
        let mut rx = ctx.subscribe();
        let opts = BatchOptions::new("generateSpeech", RunMode::Pipeline);

        BatchRunner::new(&ctx)
            .run(&opts, vec![SceneItem::new(11, 3)], |_scene| async { Ok(()) })
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert!(events.contains(&DashboardEvent::ItemStarted {
            batch: "generateSpeech".into(),
            item_id: 11,
            video_id: Some(VideoId(3)),
        }));
        assert!(events.contains(&DashboardEvent::BatchFinished {
            batch: "generateSpeech".into(),
            attempted: 1,
            failed: 0,
        }));
    }
}
