//! Enrichment-and-aggregation pipeline
//!
//! - [`envelope`]: raw items to [`Envelope`](crate::core::Envelope)s
//! - [`join`]: attaches product and user payloads onto transactions
//! - [`aggregate`]: folds enriched transactions into summary statistics
//!
//! Everything here is synchronous and owns no state between calls.

pub mod aggregate;
pub mod envelope;
pub mod join;

// Re-export commonly used items
pub use aggregate::{
    average_value, category_counts, most_popular_category, spending_per_identity, CategoryCounts,
    Identity, SpendingByIdentity, TransactionInsights,
};
pub use envelope::{envelope_batch, make_envelope, BatchPolicy};
pub use join::{enrich_transactions, join_by_key, JoinSpec, KeyMatch, PRODUCT_JOIN, USER_JOIN};
