//! Record envelope construction
//!
//! The mapping from raw upstream items to envelopes is a plain function,
//! applied by the acquisition layer after its transport call.

use crate::core::error::{EnvelopeError, Result};
use crate::core::types::{EntityType, Envelope, Provenance};
use crate::system::metrics::Metrics;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// What happens to a batch when one of its items cannot be enveloped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// One bad item empties the whole batch
    #[default]
    DropBatch,
    /// Bad items are skipped, the rest of the batch survives
    SkipItem,
}

impl std::str::FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "drop_batch" | "drop-batch" => Ok(BatchPolicy::DropBatch),
            "skip_item" | "skip-item" => Ok(BatchPolicy::SkipItem),
            other => Err(format!(
                "Invalid batch policy: {}. Valid options: drop_batch, skip_item",
                other
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Wrap one raw item.
///
/// Any JSON object is accepted as-is. Items that are not objects cannot serve
/// as a payload mapping and are rejected with [`EnvelopeError::NotAMapping`].
pub fn make_envelope(raw_item: Value, entity_type: EntityType, source_url: &str) -> Result<Envelope> {
    let payload = match raw_item {
        Value::Object(payload) => payload,
        other => {
            return Err(EnvelopeError::NotAMapping {
                entity_type: entity_type.to_string(),
                found: json_kind(&other),
            }
            .into())
        }
    };

    let captured_at = Utc::now();
    // Clock can step backwards between reads
    let processed_at = Utc::now().max(captured_at);

    Ok(Envelope {
        entity_id: format!("{}-{}", entity_type, Uuid::new_v4()),
        entity_type,
        captured_at,
        payload,
        provenance: Provenance {
            source: source_url.to_string(),
            processed_at,
        },
    })
}

/// Wrap a whole fetched batch according to `policy`.
///
/// Never fails: under [`BatchPolicy::DropBatch`] the first bad item turns the
/// result into an empty vector.
pub fn envelope_batch(
    items: Vec<Value>,
    entity_type: EntityType,
    source_url: &str,
    policy: BatchPolicy,
) -> Vec<Envelope> {
    let metrics = Metrics::global();
    let mut envelopes = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        match make_envelope(item, entity_type, source_url) {
            Ok(envelope) => envelopes.push(envelope),
            Err(e) => {
                metrics.envelopes_rejected.with_label_values(&[entity_type.as_str()]).inc();
                match policy {
                    BatchPolicy::DropBatch => {
                        warn!(entity = %entity_type, index, error = %e, "Dropping batch");
                        return Vec::new();
                    }
                    BatchPolicy::SkipItem => {
                        warn!(entity = %entity_type, index, error = %e, "Skipping item");
                    }
                }
            }
        }
    }

    metrics
        .envelopes_created
        .with_label_values(&[entity_type.as_str()])
        .inc_by(envelopes.len() as u64);
    envelopes
}
