//! Core domain types for interaction data.
//!
//! This module defines the identifiers, the three signal kinds and the
//! `InteractionLog` that the rest of the workspace consumes.

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// Canonical identifier shared by users and products.
///
/// Raw keys arrive as strings (or array positions) and are normalized into
/// this type at load time. Ordering is "natural": all-digit ids compare by
/// numeric value, so `"2" < "10"`, and sort ahead of any other id, which
/// compare lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

/// Identifier for a user
pub type UserId = EntityId;

/// Identifier for a product
pub type ProductId = EntityId;

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.0.as_str(), other.0.as_str());
        match (is_numeric(a), is_numeric(b)) {
            (true, true) => {
                // Compare digit strings without parsing so arbitrarily long ids work
                let a_digits = a.trim_start_matches('0');
                let b_digits = b.trim_start_matches('0');
                a_digits
                    .len()
                    .cmp(&b_digits.len())
                    .then_with(|| a_digits.cmp(b_digits))
                    .then_with(|| a.cmp(b))
            }
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.cmp(b),
        }
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for EntityId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

// =============================================================================
// Signals and records
// =============================================================================

/// The three interaction signals, in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    View,
    Purchase,
    Rating,
}

impl Signal {
    /// Top-level section name in the exported document
    pub fn section(self) -> &'static str {
        match self {
            Signal::View => "views",
            Signal::Purchase => "purchases",
            Signal::Rating => "ratings",
        }
    }

    /// Name of the numeric field inside a record object
    pub fn field(self) -> &'static str {
        match self {
            Signal::View => "viewCount",
            Signal::Purchase => "purchaseCount",
            Signal::Rating => "rating",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::View => "view",
            Signal::Purchase => "purchase",
            Signal::Rating => "rating",
        })
    }
}

/// One observed interaction between a user and a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InteractionRecord {
    View {
        user: UserId,
        product: ProductId,
        view_count: u64,
    },
    Purchase {
        user: UserId,
        product: ProductId,
        purchase_count: u64,
    },
    Rating {
        user: UserId,
        product: ProductId,
        /// Application-defined scale; only finiteness is enforced
        rating: f64,
    },
}

impl InteractionRecord {
    pub fn signal(&self) -> Signal {
        match self {
            InteractionRecord::View { .. } => Signal::View,
            InteractionRecord::Purchase { .. } => Signal::Purchase,
            InteractionRecord::Rating { .. } => Signal::Rating,
        }
    }

    pub fn user(&self) -> &UserId {
        match self {
            InteractionRecord::View { user, .. }
            | InteractionRecord::Purchase { user, .. }
            | InteractionRecord::Rating { user, .. } => user,
        }
    }

    pub fn product(&self) -> &ProductId {
        match self {
            InteractionRecord::View { product, .. }
            | InteractionRecord::Purchase { product, .. }
            | InteractionRecord::Rating { product, .. } => product,
        }
    }
}

// =============================================================================
// InteractionLog
// =============================================================================

/// Sparse per-signal data: `user -> product -> value`.
///
/// A missing user or product means "no data", not zero.
pub type SignalMap<V> = HashMap<UserId, HashMap<ProductId, V>>;

/// The loader's output: all three signals, each keyed by (user, product).
///
/// Each pair appears at most once per signal; `insert_record` enforces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionLog {
    pub(crate) views: SignalMap<u64>,
    pub(crate) purchases: SignalMap<u64>,
    pub(crate) ratings: SignalMap<f64>,
}

impl InteractionLog {
    /// Creates a new, empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a log from already-validated signal maps
    pub fn from_signals(
        views: SignalMap<u64>,
        purchases: SignalMap<u64>,
        ratings: SignalMap<f64>,
    ) -> Self {
        Self {
            views,
            purchases,
            ratings,
        }
    }

    /// Build a log from a stream of records, rejecting duplicates
    pub fn from_records(records: impl IntoIterator<Item = InteractionRecord>) -> Result<Self> {
        let mut log = Self::new();
        for record in records {
            log.insert_record(record)?;
        }
        Ok(log)
    }

    pub fn views(&self) -> &SignalMap<u64> {
        &self.views
    }

    pub fn purchases(&self) -> &SignalMap<u64> {
        &self.purchases
    }

    pub fn ratings(&self) -> &SignalMap<f64> {
        &self.ratings
    }

    /// Insert one record into the matching signal map
    pub fn insert_record(&mut self, record: InteractionRecord) -> Result<()> {
        let signal = record.signal();
        let duplicate = match record {
            InteractionRecord::View {
                user,
                product,
                view_count,
            } => insert_unique(&mut self.views, user, product, view_count),
            InteractionRecord::Purchase {
                user,
                product,
                purchase_count,
            } => insert_unique(&mut self.purchases, user, product, purchase_count),
            InteractionRecord::Rating {
                user,
                product,
                rating,
            } => insert_unique(&mut self.ratings, user, product, rating),
        };

        match duplicate {
            Some((user, product)) => Err(DataLoadError::DuplicateRecord {
                signal,
                user: user.to_string(),
                product: product.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Flatten every signal into records, ordered by signal, then user, then product
    pub fn records(&self) -> Vec<InteractionRecord> {
        let mut records = Vec::with_capacity(self.record_count());
        for (user, product, &view_count) in sorted_entries(&self.views) {
            records.push(InteractionRecord::View {
                user: user.clone(),
                product: product.clone(),
                view_count,
            });
        }
        for (user, product, &purchase_count) in sorted_entries(&self.purchases) {
            records.push(InteractionRecord::Purchase {
                user: user.clone(),
                product: product.clone(),
                purchase_count,
            });
        }
        for (user, product, &rating) in sorted_entries(&self.ratings) {
            records.push(InteractionRecord::Rating {
                user: user.clone(),
                product: product.clone(),
                rating,
            });
        }
        records
    }

    /// Number of records per signal: (views, purchases, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            count_entries(&self.views),
            count_entries(&self.purchases),
            count_entries(&self.ratings),
        )
    }

    pub fn record_count(&self) -> usize {
        let (views, purchases, ratings) = self.counts();
        views + purchases + ratings
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

/// Returns the rejected key pair when the slot was already taken
fn insert_unique<V>(
    map: &mut SignalMap<V>,
    user: UserId,
    product: ProductId,
    value: V,
) -> Option<(UserId, ProductId)> {
    let products = map.entry(user.clone()).or_default();
    if products.contains_key(&product) {
        return Some((user, product));
    }
    products.insert(product, value);
    None
}

fn sorted_entries<V>(map: &SignalMap<V>) -> Vec<(&UserId, &ProductId, &V)> {
    let mut entries: Vec<_> = map
        .iter()
        .flat_map(|(user, products)| {
            products
                .iter()
                .map(move |(product, value)| (user, product, value))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));
    entries
}

fn count_entries<V>(map: &SignalMap<V>) -> usize {
    map.values().map(|products| products.len()).sum()
}
