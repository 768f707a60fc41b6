//! Prometheus metrics for the HTTP server.
//!
//! Server-side collectors (HTTP traffic, auth failures, execution gauges) are
//! registered alongside the pipeline metrics exported by `veille_core`.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "veille_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 60.0, 300.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "veille_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Rejected API keys.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_auth_failures_total", "Total authentication failures"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Execution Gauges (collected dynamically)
// =============================================================================

/// Whether an execution is in flight (1) or not (0).
pub static EXECUTION_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "veille_execution_running",
        "Whether a pipeline execution is currently running",
    )
    .unwrap()
});

/// Unix timestamp of the last finished execution.
pub static LAST_EXECUTION_TIMESTAMP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "veille_last_execution_timestamp_seconds",
        "Completion time of the most recent finished execution",
    )
    .unwrap()
});

/// Unix timestamp of the next scheduled run (0 when the scheduler is off).
pub static NEXT_SCHEDULED_RUN_TIMESTAMP: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "veille_next_scheduled_run_timestamp_seconds",
        "Next scheduled execution time",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Executions
    registry
        .register(Box::new(EXECUTION_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(LAST_EXECUTION_TIMESTAMP.clone()))
        .unwrap();
    registry
        .register(Box::new(NEXT_SCHEDULED_RUN_TIMESTAMP.clone()))
        .unwrap();

    // Core metrics (pipeline stages, model calls, deliveries, scheduler)
    for metric in veille_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh gauges that mirror the service state.
pub fn collect_dynamic_metrics(state: &AppState) {
    let status = state.service().status();

    EXECUTION_RUNNING.set(i64::from(status.is_running));
    if let Some(finished_at) = status.last_execution.and_then(|e| e.completed_at) {
        LAST_EXECUTION_TIMESTAMP.set(finished_at.timestamp());
    }
    NEXT_SCHEDULED_RUN_TIMESTAMP.set(
        status
            .next_scheduled_run
            .map(|next| next.timestamp())
            .unwrap_or(0),
    );
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("uuid pattern compiles")
});

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("numeric segment pattern compiles"));

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    NUMERIC_SEGMENT.replace_all(&result, "/{id}$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/pipeline/executions/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/pipeline/executions/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/pipeline/executions/12345";
        assert_eq!(normalize_path(path), "/api/v1/pipeline/executions/{id}");
    }

    #[test]
    fn test_normalize_path_nested_ids() {
        let path = "/api/v1/items/42/runs/550e8400-e29b-41d4-a716-446655440000/7";
        assert_eq!(normalize_path(path), "/api/v1/items/{id}/runs/{id}/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(
            normalize_path("/api/v1/pipeline/history"),
            "/api/v1/pipeline/history"
        );
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("veille_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_server_and_core_metrics() {
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        EXECUTION_RUNNING.set(0);
        veille_core::metrics::SCHEDULER_TICKS
            .with_label_values(&["completed"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("veille_http_request_duration_seconds"));
        assert!(output.contains("veille_http_requests_in_flight"));
        assert!(output.contains("veille_execution_running"));
        assert!(output.contains("veille_scheduler_ticks_total"));
    }
}
