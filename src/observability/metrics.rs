//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `phc_outcomes_total` (counter): round trips by endpoint and result
//! - `phc_drop_probability` (gauge): last published drop probability per endpoint
//! - `phc_rollovers_total` (counter): completed stats window rollovers
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the health classification of one round trip.
pub fn record_outcome(endpoint: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("phc_outcomes_total", "endpoint" => endpoint.to_string(), "result" => result)
        .increment(1);
}

/// Record an endpoint's newly published drop probability.
pub fn record_drop_probability(endpoint: &str, probability: f64) {
    gauge!("phc_drop_probability", "endpoint" => endpoint.to_string()).set(probability);
}

/// Record a completed rollover.
pub fn record_rollover() {
    counter!("phc_rollovers_total").increment(1);
}
