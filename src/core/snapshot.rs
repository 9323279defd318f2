//! Snapshot handle
//!
//! Holds the most recent acquisition, with transactions already enriched.
//! Readers clone an `Arc` out of the lock; [`SnapshotStore::refresh`] builds
//! the replacement outside the lock and swaps it in.

use crate::core::types::{EntityType, Envelope};
use crate::pipeline::aggregate::TransactionInsights;
use crate::pipeline::join::enrich_transactions;
use crate::sources::{acquire_all, Acquired, DataSource};
use crate::system::metrics::Metrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

/// One enriched acquisition
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Product envelopes
    pub products: Vec<Envelope>,
    /// User envelopes
    pub users: Vec<Envelope>,
    /// Transaction envelopes with `product_details` and `user_details` attached
    pub transactions: Vec<Envelope>,
    /// When the snapshot was assembled
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Snapshot with no records
    pub fn empty() -> Self {
        Self::from_acquired(Acquired::default())
    }

    /// Enrich the transactions of an acquisition
    pub fn from_acquired(acquired: Acquired) -> Self {
        let transactions = enrich_transactions(acquired.transactions, &acquired.products, &acquired.users);
        Self {
            products: acquired.products,
            users: acquired.users,
            transactions,
            taken_at: Utc::now(),
        }
    }

    /// Acquire from `source` and enrich
    pub async fn capture(source: &dyn DataSource) -> Self {
        let started = Instant::now();
        let snapshot = Self::from_acquired(acquire_all(source).await);
        Metrics::global()
            .refresh_duration
            .observe(started.elapsed().as_secs_f64());
        snapshot
    }

    /// Records of one entity type
    pub fn records(&self, entity_type: EntityType) -> &[Envelope] {
        match entity_type {
            EntityType::Product => &self.products,
            EntityType::User => &self.users,
            EntityType::Transaction => &self.transactions,
        }
    }

    /// Aggregates over the enriched transactions
    pub fn insights(&self) -> TransactionInsights {
        TransactionInsights::compute(&self.transactions)
    }
}

/// Record counts of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SnapshotSummary {
    /// Number of products
    pub products: usize,
    /// Number of users
    pub users: usize,
    /// Number of transactions
    pub transactions: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            products: snapshot.products.len(),
            users: snapshot.users.len(),
            transactions: snapshot.transactions.len(),
        }
    }
}

/// Shared handle to the source and its current snapshot
pub struct SnapshotStore {
    source: Arc<dyn DataSource>,
    current: RwLock<Arc<Snapshot>>,
    // Held across a whole refresh so swaps land in start order
    refresh_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Store over `source`, starting from an empty snapshot
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Store over `source`, seeded with a first acquisition
    pub async fn initialize(source: Arc<dyn DataSource>) -> Self {
        let store = Self::new(source);
        store.refresh().await;
        store
    }

    /// Current snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Re-acquire, enrich and replace the current snapshot.
    ///
    /// Overlapping refreshes run one after another, so the last one started
    /// is the one left in place.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let _guard = self.refresh_lock.lock().await;
        let snapshot = Arc::new(Snapshot::capture(self.source.as_ref()).await);
        *self.current.write() = snapshot.clone();

        Metrics::global().refreshes.inc();
        let summary = SnapshotSummary::from(snapshot.as_ref());
        info!(
            products = summary.products,
            users = summary.users,
            transactions = summary.transactions,
            "Snapshot refreshed"
        );
        snapshot
    }

    /// Acquire and enrich without touching the current snapshot
    pub async fn live(&self) -> Snapshot {
        Snapshot::capture(self.source.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use crate::pipeline::envelope::make_envelope;
    use crate::sources::StaticSource;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn source() -> Arc<dyn DataSource> {
        Arc::new(
            StaticSource::new()
                .with_items(EntityType::Product, vec![json!({"id": "1", "price": 10, "category": "A"})])
                .with_items(EntityType::User, vec![json!({"phone": "555"})])
                .with_items(EntityType::Transaction, vec![json!({"parcel_id": "1", "user_phone": "555"})]),
        )
    }

    #[tokio::test]
    async fn test_new_store_starts_empty() {
        let store = SnapshotStore::new(source());
        let snapshot = store.current();
        assert!(snapshot.transactions.is_empty());
        assert_eq!(snapshot.insights().average_value, 0.0);
    }

    #[tokio::test]
    async fn test_refresh_swaps_snapshot() {
        let store = SnapshotStore::new(source());
        let before = store.current();

        store.refresh().await;
        let after = store.current();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(SnapshotSummary::from(after.as_ref()), SnapshotSummary { products: 1, users: 1, transactions: 1 });
        assert_eq!(after.transactions[0].nested("product_details", "category"), Some(&json!("A")));
        assert_eq!(after.transactions[0].nested("user_details", "phone"), Some(&json!("555")));
    }

    #[tokio::test]
    async fn test_live_leaves_current_untouched() {
        let store = SnapshotStore::initialize(source()).await;
        let current = store.current();

        let live = store.live().await;
        assert_eq!(live.transactions.len(), 1);
        assert!(Arc::ptr_eq(&current, &store.current()));
    }

    /// Stamps each product batch with a sequence number; the first fetch is slow
    struct SequencedSource {
        calls: AtomicU64,
    }

    #[async_trait]
    impl DataSource for SequencedSource {
        async fn fetch(&self, entity_type: EntityType) -> Result<Vec<Envelope>> {
            if entity_type != EntityType::Product {
                return Ok(Vec::new());
            }
            let seq = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if seq == 1 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(vec![make_envelope(json!({"id": 1, "seq": seq}), entity_type, "test://sequenced")?])
        }

        fn describe(&self) -> String {
            "sequenced".to_string()
        }
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_keep_latest() {
        let store = SnapshotStore::new(Arc::new(SequencedSource { calls: AtomicU64::new(0) }));

        // The first refresh starts first but its fetch finishes last
        let (first, second) = tokio::join!(store.refresh(), store.refresh());

        assert_eq!(first.products[0].field("seq"), Some(&json!(1)));
        assert_eq!(second.products[0].field("seq"), Some(&json!(2)));
        assert!(Arc::ptr_eq(&store.current(), &second));
    }

    #[test]
    fn test_records_by_entity_type() {
        let snapshot = Snapshot::empty();
        for entity_type in EntityType::ALL {
            assert!(snapshot.records(entity_type).is_empty());
        }
    }
}
