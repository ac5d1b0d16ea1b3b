//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Marketplace requests (count and latency per operation)
//! - Mediator loads by load type and outcome
//! - Cache page hits and misses seen by pagers

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Marketplace
// =============================================================================

/// Marketplace requests total by operation and outcome.
pub static MARKETPLACE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pokeprice_marketplace_requests_total",
            "Total marketplace requests",
        ),
        &["operation", "outcome"], // "search"/"details"; "success" or an error kind
    )
    .unwrap()
});

/// Marketplace request duration in seconds.
pub static MARKETPLACE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pokeprice_marketplace_duration_seconds",
            "Duration of marketplace requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Paging
// =============================================================================

/// Mediator loads total by load type and outcome.
pub static MEDIATOR_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pokeprice_mediator_loads_total", "Total mediator loads"),
        &["load_type", "outcome"], // "success", "end_of_pagination", "error"
    )
    .unwrap()
});

/// Pages served from the cache without a marketplace request.
pub static CACHE_PAGE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pokeprice_cache_page_hits_total",
        "Pages served from the local cache",
    )
    .unwrap()
});

/// Pages that had to be fetched from the marketplace.
pub static CACHE_PAGE_MISSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pokeprice_cache_page_misses_total",
        "Pages missing from the local cache",
    )
    .unwrap()
});

/// Result rows written to the cache.
pub static ITEMS_PERSISTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pokeprice_items_persisted_total",
        "Result rows written to the local cache",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Marketplace
        Box::new(MARKETPLACE_REQUESTS.clone()),
        Box::new(MARKETPLACE_DURATION.clone()),
        // Paging
        Box::new(MEDIATOR_LOADS.clone()),
        Box::new(CACHE_PAGE_HITS.clone()),
        Box::new(CACHE_PAGE_MISSES.clone()),
        Box::new(ITEMS_PERSISTED.clone()),
    ]
}
