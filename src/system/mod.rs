//! System-level services: metrics collection and exposition.

pub mod metrics;

pub use metrics::Metrics;
