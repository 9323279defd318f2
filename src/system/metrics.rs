//! Metrics collection for Storefront Insights
//!
//! Prometheus counters for acquisition and the pipeline, registered once in
//! the default registry and rendered by the `/metrics` endpoint.

use crate::core::error::Result;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

/// Centralized metrics for acquisition, enveloping and joins
pub struct Metrics {
    /// Upstream fetches attempted, by entity type
    pub fetches: IntCounterVec,
    /// Upstream fetches that failed and degraded to an empty batch, by entity type
    pub fetch_failures: IntCounterVec,
    /// Envelopes created, by entity type
    pub envelopes_created: IntCounterVec,
    /// Raw items rejected by envelope construction, by entity type
    pub envelopes_rejected: IntCounterVec,
    /// Base records that matched a lookup record, by attached field
    pub join_matched: IntCounterVec,
    /// Base records that got the empty default, by attached field
    pub join_unmatched: IntCounterVec,
    /// Snapshot refreshes completed
    pub refreshes: IntCounter,
    /// Acquisition plus enrichment duration in seconds
    pub refresh_duration: Histogram,
}

impl Metrics {
    /// Create and register a new metrics instance
    fn new() -> Result<Self> {
        Ok(Self {
            fetches: register_int_counter_vec!(
                "si_fetches_total",
                "Total number of upstream fetches",
                &["entity"]
            )?,
            fetch_failures: register_int_counter_vec!(
                "si_fetch_failures_total",
                "Total number of failed upstream fetches",
                &["entity"]
            )?,
            envelopes_created: register_int_counter_vec!(
                "si_envelopes_created_total",
                "Total number of envelopes created",
                &["entity"]
            )?,
            envelopes_rejected: register_int_counter_vec!(
                "si_envelopes_rejected_total",
                "Total number of raw items rejected during enveloping",
                &["entity"]
            )?,
            join_matched: register_int_counter_vec!(
                "si_join_matched_total",
                "Total number of joined records that found a match",
                &["attach_as"]
            )?,
            join_unmatched: register_int_counter_vec!(
                "si_join_unmatched_total",
                "Total number of joined records without a match",
                &["attach_as"]
            )?,
            refreshes: register_int_counter!(
                "si_refreshes_total",
                "Total number of snapshot refreshes"
            )?,
            refresh_duration: register_histogram!(
                "si_refresh_duration_seconds",
                "Duration of acquisition plus enrichment"
            )?,
        })
    }

    /// Get the global metrics instance
    pub fn global() -> &'static Metrics {
        static INSTANCE: Lazy<Metrics> = Lazy::new(|| {
            Metrics::new().expect("Failed to initialize metrics")
        });
        &INSTANCE
    }
}

/// Force registration so `/metrics` lists every family from the first scrape
pub fn init_registry() {
    let _ = Metrics::global();
}

/// Render the default registry in the Prometheus text format
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| crate::core::error::Error::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_registered_families() {
        init_registry();
        Metrics::global().refreshes.inc();

        let text = render().unwrap();
        assert!(text.contains("si_refreshes_total"));
    }
}
