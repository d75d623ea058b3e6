//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vflow_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vflow_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vflow_http_requests_in_flight";

    pub const WS_CONNECTIONS_TOTAL: &str = "vflow_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "vflow_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "vflow_ws_messages_sent_total";
    pub const WS_EVENTS_DROPPED: &str = "vflow_ws_events_dropped_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_ws_connection() {
    counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(names::WS_CONNECTIONS_ACTIVE).increment(1.0);
}

pub fn record_ws_disconnect() {
    gauge!(names::WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

pub fn record_ws_message_sent(event_type: &str) {
    let labels = [("type", event_type.to_string())];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Events a slow client missed because the broadcast buffer wrapped.
pub fn record_ws_events_dropped(count: u64) {
    counter!(names::WS_EVENTS_DROPPED).increment(count);
}

/// Replace numeric path segments with `:id` so labels stay bounded.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
