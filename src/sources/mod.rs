//! Acquisition collaborators
//!
//! A [`DataSource`] hands the pipeline enveloped records for one entity type.
//! [`acquire`] and [`acquire_all`] wrap it with the fail-soft policy: a source
//! error becomes an empty batch and a warning, never an error for the caller.

pub mod http;
pub mod memory;

use crate::core::error::Result;
use crate::core::types::{EntityType, Envelope};
use crate::system::metrics::Metrics;
use async_trait::async_trait;
use tracing::{info, warn};

pub use http::HttpSource;
pub use memory::StaticSource;

/// Supplier of enveloped records
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch and envelope every record of `entity_type`
    async fn fetch(&self, entity_type: EntityType) -> Result<Vec<Envelope>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// One acquisition of all three collections
#[derive(Debug, Clone, Default)]
pub struct Acquired {
    /// Product envelopes
    pub products: Vec<Envelope>,
    /// User envelopes
    pub users: Vec<Envelope>,
    /// Transaction envelopes, not yet enriched
    pub transactions: Vec<Envelope>,
}

/// Fetch one entity type, degrading any failure to an empty batch
pub async fn acquire(source: &dyn DataSource, entity_type: EntityType) -> Vec<Envelope> {
    let metrics = Metrics::global();
    metrics.fetches.with_label_values(&[entity_type.as_str()]).inc();

    match source.fetch(entity_type).await {
        Ok(envelopes) => {
            info!(entity = %entity_type, count = envelopes.len(), "Acquired records");
            envelopes
        }
        Err(e) => {
            metrics.fetch_failures.with_label_values(&[entity_type.as_str()]).inc();
            warn!(entity = %entity_type, source = %source.describe(), error = %e, "Acquisition failed, using empty batch");
            Vec::new()
        }
    }
}

/// Fetch all three entity types concurrently
pub async fn acquire_all(source: &dyn DataSource) -> Acquired {
    let (products, users, transactions) = tokio::join!(
        acquire(source, EntityType::Product),
        acquire(source, EntityType::User),
        acquire(source, EntityType::Transaction),
    );

    Acquired {
        products,
        users,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SourceError;
    use serde_json::json;

    struct FailingSource;

    #[async_trait]
    impl DataSource for FailingSource {
        async fn fetch(&self, entity_type: EntityType) -> Result<Vec<Envelope>> {
            Err(SourceError::Status {
                url: format!("http://upstream.invalid/{}", entity_type),
                status: 503,
            }
            .into())
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[tokio::test]
    async fn test_acquire_degrades_to_empty() {
        let envelopes = acquire(&FailingSource, EntityType::User).await;
        assert!(envelopes.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_all_collects_each_entity() {
        let source = StaticSource::new()
            .with_items(EntityType::Product, vec![json!({"id": 1})])
            .with_items(EntityType::Transaction, vec![json!({"parcel_id": 1}), json!({"parcel_id": 2})]);

        let acquired = acquire_all(&source).await;
        assert_eq!(acquired.products.len(), 1);
        assert!(acquired.users.is_empty());
        assert_eq!(acquired.transactions.len(), 2);
        assert_eq!(acquired.transactions[0].entity_type, EntityType::Transaction);
    }
}
