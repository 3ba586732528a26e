//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balboa_requests_total` (counter): dispatched connections by protocol, status
//! - `balboa_request_duration_seconds` (histogram): time spent in dispatch
//! - `balboa_websocket_sessions` (gauge): registered WebSocket sessions

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Record one finished dispatch.
pub fn record_request(protocol: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    ::metrics::counter!("balboa_requests_total", "protocol" => protocol, "status" => status).increment(1);
    ::metrics::histogram!("balboa_request_duration_seconds", "protocol" => protocol)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_sessions(count: usize) {
    ::metrics::gauge!("balboa_websocket_sessions").set(count as f64);
}

/// Install the Prometheus exporter with its own HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(metrics_address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}
