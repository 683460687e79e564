//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (submissions, worker outcomes, build duration)
//! - Content store (requests, retries, remaining quota)
//! - External services (uploads, build triggers)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs submitted through the producer.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pressroom_jobs_submitted_total", "Total publish jobs submitted"),
        &["mode"], // "live", "simulated"
    )
    .unwrap()
});

/// Jobs finished by a worker, by terminal status.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pressroom_jobs_finished_total", "Total jobs finished by workers"),
        &["status"], // "completed", "failed"
    )
    .unwrap()
});

/// Time from dequeue to terminal status.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pressroom_job_duration_seconds",
            "Duration of a worker processing one job",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0]),
        &["status"],
    )
    .unwrap()
});

/// In-flight jobs failed by the lease reaper.
pub static JOBS_REAPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pressroom_jobs_reaped_total",
        "Total in-flight jobs failed after their worker lease expired",
    )
    .unwrap()
});

// =============================================================================
// Content Store Metrics
// =============================================================================

/// Content store requests by operation and outcome.
pub static CONTENT_STORE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pressroom_content_store_requests_total",
            "Total content store HTTP requests",
        ),
        &["operation", "outcome"], // outcome: "success", "conflict", "rate_limited", "error"
    )
    .unwrap()
});

/// Retries scheduled by the content store client.
pub static CONTENT_STORE_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pressroom_content_store_retries_total",
            "Total content store retries",
        ),
        &["reason"], // "conflict", "rate_limited", "network"
    )
    .unwrap()
});

/// Last observed remaining request quota.
pub static CONTENT_STORE_QUOTA_REMAINING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pressroom_content_store_quota_remaining",
        "Remaining content store requests in the current window",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pressroom_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pressroom_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(JOBS_REAPED.clone()),
        // Content store
        Box::new(CONTENT_STORE_REQUESTS.clone()),
        Box::new(CONTENT_STORE_RETRIES.clone()),
        Box::new(CONTENT_STORE_QUOTA_REMAINING.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}

/// Record one external call's outcome and latency.
pub fn observe_external(service: &str, operation: &str, ok: bool, seconds: f64) {
    let status = if ok { "success" } else { "error" };
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(seconds);
}
