//! Data-layer metrics.
//!
//! - Request counters by operation and status
//! - Latency histograms
//! - Retry counters

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Total data-layer requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "datastore_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "datastore_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "datastore_latency_seconds";

    /// Rows returned by list calls, by table.
    pub const ROWS_RETURNED_TOTAL: &str = "datastore_rows_returned_total";
}

/// Record metrics for a completed request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Record rows returned by a list call.
pub fn record_rows(table: &str, rows: usize) {
    counter!(names::ROWS_RETURNED_TOTAL, "table" => table.to_string()).increment(rows as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.starts_with("datastore_"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }
}
