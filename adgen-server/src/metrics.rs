//! Prometheus metrics for adgen-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const HTTP_REQUESTS_TOTAL: &str = "adgen_http_requests_total";
const HTTP_REQUEST_DURATION: &str = "adgen_http_request_duration_seconds";
const VALIDATION_FAILURES_TOTAL: &str = "adgen_validation_failures_total";
const RATE_LIMITED_TOTAL: &str = "adgen_rate_limited_total";
const UPSTREAM_CALLS_TOTAL: &str = "adgen_upstream_calls_total";
const EXPORT_BYTES: &str = "adgen_export_output_bytes";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record an HTTP request.
///
/// # Arguments
///
/// * `method` - HTTP method (GET, POST, etc.)
/// * `path` - Matched route
/// * `status` - HTTP status code
/// * `duration_secs` - Request duration in seconds
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (image_type, pdf_type, size, etc.)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

/// Record a rate-limited request.
///
/// # Arguments
///
/// * `policy` - Policy that rejected the request (global, upload, ai_analysis, export)
pub fn record_rate_limited(policy: &str) {
    counter!(
        RATE_LIMITED_TOTAL,
        "policy" => policy.to_string()
    )
    .increment(1);
}

/// Record an outbound service call.
///
/// # Arguments
///
/// * `service` - "cloudinary", "remove_bg", "ollama"
/// * `success` - Whether the call succeeded
pub fn record_upstream_call(service: &str, success: bool) {
    counter!(
        UPSTREAM_CALLS_TOTAL,
        "service" => service.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record the size of an optimized export.
#[allow(clippy::cast_precision_loss)]
pub fn record_export_size(bytes: usize) {
    histogram!(EXPORT_BYTES).record(bytes as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder these are no-ops; they must not panic.
    #[test]
    fn test_recording_without_recorder() {
        record_http_request("GET", "/api/health", 200, 0.01);
        record_validation_failure("image_type");
        record_rate_limited("global");
        record_upstream_call("ollama", false);
        record_export_size(1024);
    }
}
