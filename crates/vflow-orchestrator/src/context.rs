//! Orchestration context.
//!
//! Holds the state every batch and pipeline run reports into: in-flight
//! flags, the "currently processing" markers, clip-render sub-progress and
//! the running pipeline stage. Changes are published to UI clients on a
//! broadcast channel. Each test builds its own context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use vflow_models::{BatchOperationState, DashboardEvent, ProgressTriple, StageName, VideoId};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Shared, injectable orchestration state.
pub struct OrchestrationContext {
    state: Mutex<BatchOperationState>,
    events: broadcast::Sender<DashboardEvent>,
    handlers_ready: AtomicBool,
}

impl OrchestrationContext {
    pub fn new(event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            state: Mutex::new(BatchOperationState::default()),
            events,
            handlers_ready: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Publish an event. Having no listeners is fine.
    pub fn emit(&self, event: DashboardEvent) {
        if self.events.send(event).is_err() {
            debug!("No dashboard listeners");
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn snapshot(&self) -> BatchOperationState {
        self.state.lock().clone()
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.state.lock().is_in_flight(name)
    }

    /// Mark a batch as in flight. Refused if one with the same name already is.
    ///
    /// The returned guard clears the flag and the "currently processing"
    /// markers when dropped.
    pub fn try_begin_batch(&self, name: &str) -> OrchestratorResult<InFlightGuard<'_>> {
        self.begin(name, true)
    }

    /// Like [`try_begin_batch`](Self::try_begin_batch) but the guard leaves
    /// the processing markers alone and only resets sub-progress.
    pub fn try_begin_render(&self, name: &str) -> OrchestratorResult<InFlightGuard<'_>> {
        self.begin(name, false)
    }

    fn begin(&self, name: &str, clears_markers: bool) -> OrchestratorResult<InFlightGuard<'_>> {
        let mut state = self.state.lock();
        if state.is_in_flight(name) {
            return Err(OrchestratorError::busy(name));
        }
        state.in_flight.insert(name.to_string(), true);
        Ok(InFlightGuard {
            ctx: self,
            name: name.to_string(),
            clears_markers,
        })
    }

    pub fn set_current(&self, item_id: i64, video_id: Option<VideoId>) {
        let mut state = self.state.lock();
        state.current_item_id = Some(item_id);
        state.current_video_id = video_id;
    }

    pub fn clear_current(&self) {
        let mut state = self.state.lock();
        state.current_item_id = None;
        state.current_video_id = None;
        state.progress = None;
    }

    pub fn set_progress(&self, progress: Option<ProgressTriple>) {
        self.state.lock().progress = progress;
    }

    pub fn set_stage(&self, stage: Option<StageName>) {
        self.state.lock().current_stage = stage;
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Declare that the capability handlers the pipeline depends on are wired.
    pub fn mark_handlers_ready(&self) {
        self.handlers_ready.store(true, Ordering::SeqCst);
    }

    pub fn handlers_ready(&self) -> bool {
        self.handlers_ready.load(Ordering::SeqCst)
    }

    pub fn pipeline_running(&self) -> bool {
        self.state.lock().pipeline_running
    }

    /// Claim the single pipeline slot.
    ///
    /// The guard owns a handle on the context so it can be moved into a
    /// spawned task; the slot stays claimed until the guard drops.
    pub fn try_begin_pipeline(self: &Arc<Self>) -> OrchestratorResult<PipelineGuard> {
        if !self.handlers_ready() {
            return Err(OrchestratorError::NotReady);
        }
        let mut state = self.state.lock();
        if state.pipeline_running {
            return Err(OrchestratorError::AlreadyRunning);
        }
        state.pipeline_running = true;
        Ok(PipelineGuard { ctx: Arc::clone(self) })
    }
}

/// Clears an in-flight flag on drop.
pub struct InFlightGuard<'a> {
    ctx: &'a OrchestrationContext,
    name: String,
    clears_markers: bool,
}

impl InFlightGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.ctx.state.lock();
        state.in_flight.remove(&self.name);
        state.progress = None;
        if self.clears_markers {
            state.current_item_id = None;
            state.current_video_id = None;
        }
    }
}

/// Releases the pipeline slot on drop, whatever the outcome.
pub struct PipelineGuard {
    ctx: Arc<OrchestrationContext>,
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        let mut state = self.ctx.state.lock();
        state.pipeline_running = false;
        state.current_stage = None;
        state.current_item_id = None;
        state.current_video_id = None;
        state.progress = None;
    }
}
