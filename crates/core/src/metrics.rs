//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Stream resolution (outcomes, duration, hydration, selection fallbacks)
//! - Search cascade (which tier produced results)
//! - External services (Zilean, TorBox, Real-Debrid)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Resolutions total by provider and result.
pub static RESOLUTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omega_resolutions_total", "Total stream resolutions"),
        &["provider", "result"], // result: "success" or an error code
    )
    .unwrap()
});

/// Resolution duration in seconds.
pub static RESOLUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omega_resolution_duration_seconds",
            "Duration of a full add-to-link resolution",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["provider"],
    )
    .unwrap()
});

/// Status polls needed before the file list appeared.
pub static HYDRATION_ATTEMPTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omega_hydration_attempts",
            "Number of status polls before the torrent file list was available",
        )
        .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0]),
        &["provider"],
    )
    .unwrap()
});

/// Rankings where every file was rejected and size ordering was used instead.
pub static DEGRADED_RANKINGS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "omega_degraded_rankings_total",
        "Rankings that fell back to size ordering",
    )
    .unwrap()
});

/// Episode requests answered with a file whose name did not match the episode.
pub static UNCONFIRMED_EPISODES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "omega_unconfirmed_episodes_total",
        "Episode resolutions that fell back to the top-ranked file",
    )
    .unwrap()
});

// =============================================================================
// Search Metrics
// =============================================================================

/// Search cascade outcomes by the tier that produced results.
pub static SEARCH_TIER_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "omega_search_tier_results_total",
            "Search cascade outcomes by tier",
        ),
        &["tier"], // "structured", "string_fallback", "title_only", "empty"
    )
    .unwrap()
});

/// Search results returned per cascade.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omega_search_results",
            "Number of search results returned per search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service call duration in seconds.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omega_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "omega_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Record one external call outcome.
pub fn record_external_call(service: &str, operation: &str, success: bool, elapsed_secs: f64) {
    let status = if success { "success" } else { "error" };
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(elapsed_secs);
}

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Resolution
        Box::new(RESOLUTIONS_TOTAL.clone()),
        Box::new(RESOLUTION_DURATION.clone()),
        Box::new(HYDRATION_ATTEMPTS.clone()),
        Box::new(DEGRADED_RANKINGS.clone()),
        Box::new(UNCONFIRMED_EPISODES.clone()),
        // Search
        Box::new(SEARCH_TIER_RESULTS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
