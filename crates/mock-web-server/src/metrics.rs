//! Prometheus metrics for mock-web-server.
//!
//! Tracks captured requests, served responses and unscripted interactions.
use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec, Encoder, TextEncoder};

lazy_static! {
    /// Requests captured by the listener
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mock_web_server_requests_total",
        "Total number of requests captured by the listener",
        &["method"]
    )
    .unwrap();

    /// Scripted responses written back over the socket
    pub static ref RESPONSES_TOTAL: CounterVec = register_counter_vec!(
        "mock_web_server_responses_total",
        "Total number of scripted responses served",
        &["status"]
    )
    .unwrap();

    /// Requests that found the response queue empty
    pub static ref EMPTY_QUEUE_TOTAL: Counter = register_counter!(
        "mock_web_server_empty_queue_total",
        "Total number of requests that arrived with no response queued"
    )
    .unwrap();

    /// Responses produced through the non-network dispatcher
    pub static ref DISPATCHED_TOTAL: Counter = register_counter!(
        "mock_web_server_dispatched_total",
        "Total number of responses produced by direct dispatch"
    )
    .unwrap();
}

/// Record a request captured by the listener
pub fn record_request(method: &str) {
    REQUESTS_TOTAL.with_label_values(&[method]).inc();
}

/// Record a response written to a client
pub fn record_response(status: u16) {
    RESPONSES_TOTAL
        .with_label_values(&[&status.to_string()])
        .inc();
}

pub fn record_empty_queue() {
    EMPTY_QUEUE_TOTAL.inc();
}

pub fn record_dispatch() {
    DISPATCHED_TOTAL.inc();
}

/// Render all registered metrics in the Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
