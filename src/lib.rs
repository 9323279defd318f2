//! Storefront Insights - enrichment and aggregation over storefront data
//!
//! Fetches products, users and transactions from upstream sources, wraps each
//! item in an envelope, joins transactions against products and users, and
//! folds the result into spending, category and order-value metrics served
//! over a small read API.
#![warn(missing_docs)]

// Core foundational modules
pub mod core;

// Main functional modules
pub mod pipeline;
pub mod sources;
pub mod api;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize tracing and the metrics registry
pub fn init(logging: &crate::core::config::LoggingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!("Initializing {} v{}", NAME, VERSION);

    system::metrics::init_registry();

    Ok(())
}
