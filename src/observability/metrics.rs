//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by route and status
//! - `edge_request_duration_seconds` (histogram): latency by route
//! - `edge_rate_limited_total` (counter): requests rejected with 429
//! - `edge_image_bytes_total` (counter): image bytes streamed to clients
//! - `edge_image_rejected_total` (counter): image fetches refused, by reason
//! - `edge_content_fallback_total` (counter): content served from a fallback
//!
//! Without an installed recorder these calls are no-ops.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!("edge_requests_total", "route" => route.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("edge_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("edge_rate_limited_total").increment(1);
}

pub fn record_image_bytes(bytes: u64) {
    counter!("edge_image_bytes_total").increment(bytes);
}

pub fn record_image_rejected(reason: &'static str) {
    counter!("edge_image_rejected_total", "reason" => reason).increment(1);
}

pub fn record_content_fallback(source: &'static str) {
    counter!("edge_content_fallback_total", "source" => source).increment(1);
}
