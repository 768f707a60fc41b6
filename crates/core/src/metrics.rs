//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Executions (outcomes, durations)
//! - Stages (durations, model calls, retries, output repairs)
//! - Delivery and the daily scheduler

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Executions
// =============================================================================

/// Finished executions by status and trigger.
pub static EXECUTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_executions_total", "Total finished executions"),
        &["status", "trigger"], // status: "completed", "failed"; trigger: "manual", "scheduled"
    )
    .unwrap()
});

/// Execution wall-clock duration in seconds.
pub static EXECUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "veille_execution_duration_seconds",
            "Duration of a full pipeline execution",
        )
        .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
        &["status"],
    )
    .unwrap()
});

/// Rejected `begin()` calls (a run was already in flight).
pub static EXECUTION_CONFLICTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "veille_execution_conflicts_total",
            "Triggers rejected because an execution was running",
        ),
        &["trigger"],
    )
    .unwrap()
});

// =============================================================================
// Stages
// =============================================================================

/// Stage duration in seconds, model retries included.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("veille_stage_duration_seconds", "Duration of a pipeline stage")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["stage", "result"], // result: "success", "failure"
    )
    .unwrap()
});

/// Model calls by stage and result.
pub static MODEL_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_model_calls_total", "Total language model calls"),
        &["stage", "result"], // result: "success", "transient", "rate_limited", "invalid"
    )
    .unwrap()
});

/// Retries scheduled after a failed attempt.
pub static RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_retries_total", "Total retried model calls"),
        &["stage", "kind"], // kind: "transient", "rate_limited", "validation"
    )
    .unwrap()
});

/// Output validation outcomes per stage.
pub static OUTPUT_REPAIRS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "veille_output_repairs_total",
            "Model output parse outcomes by repair strategy",
        ),
        &["stage", "outcome"], // outcome: "strict", "code_fence", "balanced_slice", "trailing_commas", "wrapped", "rejected"
    )
    .unwrap()
});

// =============================================================================
// Delivery & scheduling
// =============================================================================

/// Delivery attempts by result.
pub static DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_deliveries_total", "Total digest deliveries"),
        &["kind", "result"], // kind: "digest", "failure_notice"; result: "delivered", "rejected", "error"
    )
    .unwrap()
});

/// Scheduler ticks by outcome.
pub static SCHEDULER_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("veille_scheduler_ticks_total", "Total scheduler ticks"),
        &["outcome"], // "completed", "failed", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Executions
        Box::new(EXECUTIONS_TOTAL.clone()),
        Box::new(EXECUTION_DURATION.clone()),
        Box::new(EXECUTION_CONFLICTS.clone()),
        // Stages
        Box::new(STAGE_DURATION.clone()),
        Box::new(MODEL_CALLS.clone()),
        Box::new(RETRIES.clone()),
        Box::new(OUTPUT_REPAIRS.clone()),
        // Delivery & scheduling
        Box::new(DELIVERIES.clone()),
        Box::new(SCHEDULER_TICKS.clone()),
    ]
}
