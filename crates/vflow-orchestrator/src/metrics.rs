//! Orchestration metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Batch items by batch and outcome.
    pub const BATCH_ITEMS_TOTAL: &str = "vflow_batch_items_total";

    /// Batch runs aborted by a batch-level error.
    pub const BATCH_ABORTS_TOTAL: &str = "vflow_batch_aborts_total";

    /// Pipeline runs by outcome.
    pub const PIPELINE_RUNS_TOTAL: &str = "vflow_pipeline_runs_total";

    /// Stage duration in seconds.
    pub const STAGE_DURATION_SECONDS: &str = "vflow_stage_duration_seconds";

    /// Decoded clip-render events by type.
    pub const CLIP_EVENTS_TOTAL: &str = "vflow_clip_events_total";

    /// Reorder requests by outcome.
    pub const REORDERS_TOTAL: &str = "vflow_reorders_total";
}

pub fn record_batch_item(batch: &str, ok: bool) {
    counter!(
        names::BATCH_ITEMS_TOTAL,
        "batch" => batch.to_string(),
        "outcome" => if ok { "ok" } else { "failed" }
    )
    .increment(1);
}

pub fn record_batch_abort(batch: &str) {
    counter!(names::BATCH_ABORTS_TOTAL, "batch" => batch.to_string()).increment(1);
}

pub fn record_pipeline_run(outcome: &'static str) {
    counter!(names::PIPELINE_RUNS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_stage_duration(stage: &str, seconds: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.to_string()).record(seconds);
}

pub fn record_clip_event(event_type: &'static str) {
    counter!(names::CLIP_EVENTS_TOTAL, "type" => event_type).increment(1);
}

pub fn record_reorder(outcome: &'static str) {
    counter!(names::REORDERS_TOTAL, "outcome" => outcome).increment(1);
}
