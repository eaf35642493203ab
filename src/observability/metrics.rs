//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by response status
//! - `edge_request_duration_seconds` (histogram): time to response head
//! - `edge_variant_selections_total` (counter): selections by variant and source
//! - `edge_upstream_errors_total` (counter): failed requests by pipeline stage
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Prometheus exporter runs its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::experiment::SelectionSource;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start_time: Instant) {
    counter!("edge_requests_total", "status" => status.to_string()).increment(1);
    histogram!("edge_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_selection(variant: usize, source: SelectionSource) {
    counter!(
        "edge_variant_selections_total",
        "variant" => variant.to_string(),
        "source" => source.as_str()
    )
    .increment(1);
}

pub fn record_upstream_error(stage: &'static str) {
    counter!("edge_upstream_errors_total", "stage" => stage).increment(1);
}
