//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by service
//! - `gateway_instance_health` (gauge): 1=healthy, 0=unhealthy, per instance
//! - `gateway_health_checks_total` (counter): probes by service and result
//! - `gateway_rate_limited_total` (counter): requests rejected with 429
//!
//! Recording is a no-op until a recorder is installed by [`init_metrics`].

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_instance_health(service: &str, id: &str, healthy: bool) {
    gauge!(
        "gateway_instance_health",
        "service" => service.to_string(),
        "instance" => id.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_check(service: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(
        "gateway_health_checks_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}
