//! Gateway metrics
//!
//! Emitted through the `metrics` facade; the service installs the recorder.
//!
//! - `ai_gateway_attempts_total` (counter): label `outcome` (`success`/`failure`)
//! - `ai_gateway_attempt_failures_total` (counter): label `classification`
//! - `ai_gateway_fallbacks_total` (counter)
//! - `ai_gateway_generate_duration_seconds` (histogram): label `outcome` (`rendered`/`fallback`)

use provider::ErrorClassification;

/// Histogram name, exported so the recorder can configure buckets for it.
pub const GENERATE_DURATION_SECONDS: &str = "ai_gateway_generate_duration_seconds";

pub fn record_attempt_success() {
    metrics::counter!("ai_gateway_attempts_total", "outcome" => "success").increment(1);
}

pub fn record_attempt_failure(classification: ErrorClassification) {
    metrics::counter!("ai_gateway_attempts_total", "outcome" => "failure").increment(1);
    metrics::counter!(
        "ai_gateway_attempt_failures_total",
        "classification" => classification.label()
    )
    .increment(1);
}

pub fn record_fallback() {
    metrics::counter!("ai_gateway_fallbacks_total").increment(1);
}

pub fn record_generate(outcome: &'static str, duration_secs: f64) {
    metrics::histogram!(GENERATE_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}
