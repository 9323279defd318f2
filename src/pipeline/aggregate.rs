//! Aggregation engine
//!
//! Pure single-pass folds over enriched transactions. Results are kept in
//! `BTreeMap`s so they serialize in a stable order regardless of input order.

use crate::core::types::Envelope;
use crate::pipeline::join::{coerce_key, KeyMatch, PRODUCT_JOIN, USER_JOIN};
use serde_json::Value;
use std::collections::BTreeMap;

/// Spending group, compared the same way the user join compares phones
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identity {
    /// String `user_phone`, verbatim
    Text(String),
    /// Non-string `user_phone` under exact matching, by its JSON text
    Other(String),
}

impl Identity {
    /// Group of a `user_phone` value; null never forms a group
    pub fn from_value(value: &Value, matching: KeyMatch) -> Option<Self> {
        match (value, matching) {
            (Value::Null, _) => None,
            (Value::String(s), _) => Some(Identity::Text(s.clone())),
            (other, KeyMatch::Coerced) => coerce_key(other).map(Identity::Text),
            (other, KeyMatch::Exact) => Some(Identity::Other(other.to_string())),
        }
    }

    /// Display text (a JSON object key on the wire)
    pub fn as_str(&self) -> &str {
        match self {
            Identity::Text(s) | Identity::Other(s) => s,
        }
    }
}

/// Spending totals keyed by identity; `None` collects transactions without a phone
pub type SpendingByIdentity = BTreeMap<Option<Identity>, f64>;

/// Purchase counts keyed by product category
pub type CategoryCounts = BTreeMap<String, u64>;

/// Attached product price; missing or non-numeric prices count as zero
pub fn product_price(txn: &Envelope) -> f64 {
    txn.nested(PRODUCT_JOIN.attach_as, "price")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

/// Attached category as a count key.
///
/// Non-empty strings, non-zero numbers and `true` count, scalars by their JSON
/// text. Empty, zero, false, null and structured values do not.
fn product_category(txn: &Envelope) -> Option<String> {
    let value = txn.nested(PRODUCT_JOIN.attach_as, "category")?;
    let present = match value {
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Bool(b) => *b,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    };
    if present {
        coerce_key(value)
    } else {
        None
    }
}

/// Total spent per `user_phone`
pub fn spending_per_identity(txns: &[Envelope]) -> SpendingByIdentity {
    txns.iter().fold(BTreeMap::new(), |mut totals, txn| {
        let identity = txn
            .field(USER_JOIN.base_key)
            .and_then(|phone| Identity::from_value(phone, USER_JOIN.matching));
        *totals.entry(identity).or_insert(0.0) += product_price(txn);
        totals
    })
}

/// Number of transactions per product category.
///
/// Transactions without a category are left out rather than bucketed.
pub fn category_counts(txns: &[Envelope]) -> CategoryCounts {
    txns.iter().filter_map(product_category).fold(BTreeMap::new(), |mut counts, category| {
        *counts.entry(category).or_insert(0) += 1;
        counts
    })
}

/// Mean product price over all transactions, `0.0` when there are none
pub fn average_value(txns: &[Envelope]) -> f64 {
    if txns.is_empty() {
        return 0.0;
    }
    let total: f64 = txns.iter().map(product_price).sum();
    total / txns.len() as f64
}

/// Category with the highest count.
///
/// Ties go to the lexicographically smallest category name.
pub fn most_popular_category(counts: &CategoryCounts) -> Option<(&str, u64)> {
    // BTreeMap iterates in ascending key order; only a strictly larger count replaces the pick
    counts.iter().fold(None, |best, (category, &count)| match best {
        Some((_, best_count)) if best_count >= count => best,
        _ => Some((category.as_str(), count)),
    })
}

/// All transaction metrics in one bundle
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInsights {
    /// Number of transactions folded
    pub transaction_count: usize,
    /// Totals per identity
    pub spending: SpendingByIdentity,
    /// Counts per category
    pub categories: CategoryCounts,
    /// Mean transaction value
    pub average_value: f64,
}

impl TransactionInsights {
    /// Compute every aggregate over `txns`
    pub fn compute(txns: &[Envelope]) -> Self {
        Self {
            transaction_count: txns.len(),
            spending: spending_per_identity(txns),
            categories: category_counts(txns),
            average_value: average_value(txns),
        }
    }

    /// Most popular category and its count
    pub fn most_popular_category(&self) -> Option<(&str, u64)> {
        most_popular_category(&self.categories)
    }

    /// Totals for transactions that carry a `user_phone`, keyed by display text.
    ///
    /// JSON object keys are strings, so a string phone and a non-string phone
    /// with the same text share one entry here.
    pub fn attributed_spending(&self) -> BTreeMap<String, f64> {
        self.spending
            .iter()
            .filter_map(|(identity, total)| identity.as_ref().map(|id| (id.as_str(), *total)))
            .fold(BTreeMap::new(), |mut totals, (id, total)| {
                *totals.entry(id.to_string()).or_insert(0.0) += total;
                totals
            })
    }

    /// Total for transactions without a `user_phone`, if there were any
    pub fn unattributed_spending(&self) -> Option<f64> {
        self.spending.get(&None).copied()
    }
}
