//! In-memory data source
//!
//! Serves fixed raw items, enveloped on every fetch. Used for fixtures, tests
//! and offline runs.

use super::DataSource;
use crate::core::error::Result;
use crate::core::types::{EntityType, Envelope};
use crate::pipeline::envelope::{envelope_batch, BatchPolicy};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Data source backed by raw items held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    items: HashMap<EntityType, Vec<Value>>,
    policy: BatchPolicy,
}

impl StaticSource {
    /// Empty source: every entity type yields no records
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw items served for `entity_type`
    pub fn with_items(mut self, entity_type: EntityType, items: Vec<Value>) -> Self {
        self.items.insert(entity_type, items);
        self
    }

    /// Set the batch policy applied when enveloping
    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn locator(entity_type: EntityType) -> String {
        format!("memory://{}", entity_type)
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch(&self, entity_type: EntityType) -> Result<Vec<Envelope>> {
        let items = self.items.get(&entity_type).cloned().unwrap_or_default();
        Ok(envelope_batch(items, entity_type, &Self::locator(entity_type), self.policy))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
