//! Prometheus metrics exposition
//!
//! Installs the recorder backing both the HTTP metrics below and the
//! gateway's own metrics (`ai_gateway_*`):
//!
//! - `http_requests_total` (counter): labels `status`, `method`, `route`
//! - `http_request_duration_seconds` (histogram): label `route`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries for request and generation latency, 5ms to 120s.
///
/// Generation calls may chain several remote attempts, so the upper range
/// goes well past a single attempt timeout.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(ai_gateway::metrics::GENERATE_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed HTTP request.
pub fn record_request(status: u16, method: &str, route: &str, duration_secs: f64) {
    metrics::counter!(
        "http_requests_total",
        "status" => status.to_string(),
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "route" => route.to_string())
        .record(duration_secs);
}
