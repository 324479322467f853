//! Prometheus metrics for upstream latency and request outcomes.
//!
//! This module provides metrics for:
//! - Upstream page fetch latency and page counts per listing
//! - End-to-end contract aggregation latency
//! - Contracts served and failed requests by error kind
//! - Measurement enrichment fallbacks

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::error::ErrorKind;
use crate::sienge::Listing;

// === Metric Name Constants ===

/// Upstream page fetch latency metric name.
pub const METRIC_UPSTREAM_PAGE_LATENCY: &str = "upstream_page_latency_ms";
/// Contract aggregation latency metric name.
pub const METRIC_AGGREGATION_LATENCY: &str = "contracts_aggregation_latency_ms";
/// Upstream pages fetched counter metric name.
pub const METRIC_UPSTREAM_PAGES: &str = "upstream_pages_total";
/// Contracts served counter metric name.
pub const METRIC_CONTRACTS_SERVED: &str = "contracts_served_total";
/// Failed contract requests counter metric name.
pub const METRIC_REQUEST_FAILURES: &str = "contracts_request_failures_total";
/// Enrichment fallback counter metric name.
pub const METRIC_ENRICHMENT_FAILURES: &str = "measurement_enrichment_failures_total";

/// Install the Prometheus recorder and return a handle for rendering.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Initialize all metric descriptions.
/// Call this once at startup, after a recorder is installed.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_UPSTREAM_PAGE_LATENCY,
        "Upstream page fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_AGGREGATION_LATENCY,
        "Time to drain and transform every contracts page in milliseconds"
    );

    describe_counter!(
        METRIC_UPSTREAM_PAGES,
        "Total number of upstream pages fetched"
    );
    describe_counter!(
        METRIC_CONTRACTS_SERVED,
        "Total number of contract records returned to callers"
    );
    describe_counter!(
        METRIC_REQUEST_FAILURES,
        "Total number of failed contract requests"
    );
    describe_counter!(
        METRIC_ENRICHMENT_FAILURES,
        "Total number of measurement enrichments that fell back to defaults"
    );

    debug!("Metrics initialized");
}

/// Record upstream page fetch latency.
pub fn record_upstream_page_latency(start: Instant, listing: Listing) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    let label: &'static str = listing.into();
    histogram!(METRIC_UPSTREAM_PAGE_LATENCY, "listing" => label).record(latency_ms);
}

/// Increment upstream pages counter.
pub fn inc_upstream_pages(listing: Listing) {
    let label: &'static str = listing.into();
    counter!(METRIC_UPSTREAM_PAGES, "listing" => label).increment(1);
}

/// Add to the contracts served counter.
pub fn add_contracts_served(count: usize) {
    counter!(METRIC_CONTRACTS_SERVED).increment(count as u64);
}

/// Increment failed requests counter.
pub fn inc_request_failures(kind: ErrorKind) {
    let label: &'static str = kind.into();
    counter!(METRIC_REQUEST_FAILURES, "kind" => label).increment(1);
}

/// Increment enrichment fallback counter.
pub fn inc_enrichment_failures() {
    counter!(METRIC_ENRICHMENT_FAILURES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for contract aggregation.
pub fn timer_aggregation() -> LatencyTimer {
    LatencyTimer::new(METRIC_AGGREGATION_LATENCY)
}
