//! Join engine
//!
//! Attaches the payload of a matching lookup record onto each base record.
//! Joins never fail: duplicate keys resolve last-write-wins, and anything that
//! does not match (missing field, null, type mismatch) gets an empty mapping.

use crate::core::types::{Envelope, Payload};
use crate::system::metrics::Metrics;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// How key values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Compare after coercing both sides to a string (`1` matches `"1"`)
    Coerced,
    /// Compare JSON values including their type (`555` does not match `"555"`)
    Exact,
}

/// One join instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSpec {
    /// Foreign-key field on the base records
    pub base_key: &'static str,
    /// Key field on the lookup records
    pub lookup_key: &'static str,
    /// Field the matched payload is attached under
    pub attach_as: &'static str,
    /// Key comparison mode
    pub matching: KeyMatch,
}

/// Transaction `parcel_id` to product `id`, string-compared
pub const PRODUCT_JOIN: JoinSpec = JoinSpec {
    base_key: "parcel_id",
    lookup_key: "id",
    attach_as: "product_details",
    matching: KeyMatch::Coerced,
};

/// Transaction `user_phone` to user `phone`, exact match
pub const USER_JOIN: JoinSpec = JoinSpec {
    base_key: "user_phone",
    lookup_key: "phone",
    attach_as: "user_details",
    matching: KeyMatch::Exact,
};

/// Outcome counts of one join pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Base records that found a lookup record
    pub matched: usize,
    /// Base records that got the empty default
    pub unmatched: usize,
}

/// Render a scalar as a string key.
///
/// Strings are used verbatim, numbers and booleans by their JSON text.
/// Null yields `None`: it never matches anything.
pub fn coerce_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn normalize_key(value: Option<&Value>, matching: KeyMatch) -> Option<String> {
    let value = value?;
    match matching {
        KeyMatch::Coerced => coerce_key(value),
        // The JSON text keeps the type: "555" and 555 stay distinct
        KeyMatch::Exact if value.is_null() => None,
        KeyMatch::Exact => Some(value.to_string()),
    }
}

/// Lookup index over one entity collection
#[derive(Debug)]
pub struct LookupIndex<'a> {
    entries: HashMap<String, &'a Payload>,
    matching: KeyMatch,
}

impl<'a> LookupIndex<'a> {
    /// Index `lookup` by `key_field`; later records overwrite earlier ones
    pub fn build(lookup: &'a [Envelope], key_field: &str, matching: KeyMatch) -> Self {
        let mut entries = HashMap::with_capacity(lookup.len());
        for record in lookup {
            if let Some(key) = normalize_key(record.field(key_field), matching) {
                entries.insert(key, &record.payload);
            }
        }
        Self { entries, matching }
    }

    /// Payload whose key equals `key`, if any
    pub fn get(&self, key: Option<&Value>) -> Option<&'a Payload> {
        normalize_key(key, self.matching).and_then(|k| self.entries.get(&k).copied())
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attach lookup payloads onto `base` in place.
///
/// Any previous value under `spec.attach_as` is overwritten, so re-running a
/// join with the same inputs gives the same result.
pub fn attach(base: &mut [Envelope], lookup: &[Envelope], spec: &JoinSpec) -> JoinStats {
    let index = LookupIndex::build(lookup, spec.lookup_key, spec.matching);
    let mut stats = JoinStats::default();

    for record in base.iter_mut() {
        let details = match index.get(record.field(spec.base_key)) {
            Some(payload) => {
                stats.matched += 1;
                payload.clone()
            }
            None => {
                stats.unmatched += 1;
                Payload::new()
            }
        };
        record.payload.insert(spec.attach_as.to_string(), Value::Object(details));
    }

    let metrics = Metrics::global();
    metrics.join_matched.with_label_values(&[spec.attach_as]).inc_by(stats.matched as u64);
    metrics.join_unmatched.with_label_values(&[spec.attach_as]).inc_by(stats.unmatched as u64);
    debug!(
        attach_as = spec.attach_as,
        keys = index.len(),
        matched = stats.matched,
        unmatched = stats.unmatched,
        "Join complete"
    );

    stats
}

/// Enrich `base` with matched `lookup` payloads and hand it back
pub fn join_by_key(mut base: Vec<Envelope>, lookup: &[Envelope], spec: &JoinSpec) -> Vec<Envelope> {
    attach(&mut base, lookup, spec);
    base
}

/// Attach `product_details` and `user_details` to every transaction
pub fn enrich_transactions(
    transactions: Vec<Envelope>,
    products: &[Envelope],
    users: &[Envelope],
) -> Vec<Envelope> {
    let transactions = join_by_key(transactions, products, &PRODUCT_JOIN);
    join_by_key(transactions, users, &USER_JOIN)
}
