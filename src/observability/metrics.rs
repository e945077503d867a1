//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_failovers_total` (counter): dispatcher moved to another instance
//! - `gateway_circuit_opened_total` (counter): breaker transitions to open
//! - `gateway_rate_limited_total` (counter): calls rejected by the limiter
//! - `gateway_cache_lookups_total` (counter): cache hits and misses

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &str, method: &str, status: u16, start: Instant) {
    let labels = [
        ("service", service.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(url: &str, healthy: bool) {
    ::metrics::gauge!("gateway_backend_health", "instance" => url.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_failover(service: &str) {
    ::metrics::counter!("gateway_failovers_total", "service" => service.to_string()).increment(1);
}

pub fn record_circuit_opened(target: &str) {
    ::metrics::counter!("gateway_circuit_opened_total", "instance" => target.to_string())
        .increment(1);
}

pub fn record_rate_limited(target: &str) {
    ::metrics::counter!("gateway_rate_limited_total", "instance" => target.to_string())
        .increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("gateway_cache_lookups_total", "result" => result).increment(1);
}
