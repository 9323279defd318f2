//! Core type definitions for Storefront Insights
//!
//! Every fetched item travels through the system wrapped in an [`Envelope`].
//! The payload stays an opaque JSON mapping; only the join and aggregation
//! code reaches into it, by field name.

use crate::core::error::{EnvelopeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Opaque entity payload: field name to JSON value
pub type Payload = Map<String, Value>;

/// The three fixed entity categories handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Catalogue item, keyed by `id`
    Product,
    /// Purchase record referencing a product and a user
    Transaction,
    /// Customer, keyed by `phone`
    User,
}

impl EntityType {
    /// All entity types, in acquisition order
    pub const ALL: [EntityType; 3] = [EntityType::Product, EntityType::User, EntityType::Transaction];

    /// Wire name of the entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::Transaction => "transaction",
            EntityType::User => "user",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "product" => Ok(EntityType::Product),
            "transaction" => Ok(EntityType::Transaction),
            "user" => Ok(EntityType::User),
            other => Err(EnvelopeError::UnknownEntityType(other.to_string())),
        }
    }
}

/// Where a record came from and when it was processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source URL (or other locator) the record was fetched from
    pub source: String,
    /// Processing timestamp, never earlier than `captured_at`
    pub processed_at: DateTime<Utc>,
}

/// Uniform wrapper around one fetched item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `<entity_type>-<uuid>`, generated once per record
    pub entity_id: String,
    /// Entity classification
    pub entity_type: EntityType,
    /// Capture timestamp (UTC)
    pub captured_at: DateTime<Utc>,
    /// Original item, stored without validation
    pub payload: Payload,
    /// Source metadata
    pub provenance: Provenance,
}

impl Envelope {
    /// Decode an already-enveloped record handed over by a collaborator.
    ///
    /// A missing payload and an unknown entity type are reported as their own
    /// [`EnvelopeError`] kinds; anything else structurally wrong is
    /// [`EnvelopeError::Malformed`].
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::Malformed("envelope is not an object".into()).into());
        };

        let entity_type = match fields.get("entity_type") {
            Some(Value::String(tag)) => tag.parse::<EntityType>()?,
            Some(other) => return Err(EnvelopeError::UnknownEntityType(other.to_string()).into()),
            None => return Err(EnvelopeError::Malformed("missing entity_type".into()).into()),
        };

        match fields.get("payload") {
            Some(Value::Object(_)) => {}
            Some(Value::Null) | None => {
                return Err(EnvelopeError::MissingPayload {
                    entity_type: entity_type.to_string(),
                }
                .into())
            }
            Some(_) => return Err(EnvelopeError::Malformed("payload is not a mapping".into()).into()),
        }

        // Normalise the tag we already validated so serde sees the canonical form
        fields.insert("entity_type".into(), Value::String(entity_type.to_string()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| EnvelopeError::Malformed(e.to_string()).into())
    }

    /// Read a payload field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Read a field of an attached sub-mapping, e.g. `product_details.price`
    pub fn nested(&self, attached: &str, name: &str) -> Option<&Value> {
        self.payload.get(attached)?.as_object()?.get(name)
    }
}
