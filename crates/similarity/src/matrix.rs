//! Matrix Builder: fuse the three signals into a dense user-by-product grid.
//!
//! ## Algorithm
//! 1. Flatten each signal map into `(user, product, value)` triples
//! 2. Full outer join on `(user, product)`; missing signals stay zero
//! 3. Pivot into one row per user and one 3-wide column group per product
//!
//! Rows and columns follow the natural id order, so the same input always
//! produces the same layout no matter how the hash maps iterate. Row `i`
//! here is row `i` of the similarity matrix built from it.

use crate::error::{Result, SimilarityError};
use data_loader::{InteractionLog, ProductId, SignalMap, UserId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Features for one (user, product) pair; absent signals are zero
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureCell {
    pub view_count: u64,
    pub purchase_count: u64,
    pub rating: f64,
}

impl FeatureCell {
    /// Number of scalar features per product
    pub const WIDTH: usize = 3;

    /// Features in vector order: views, purchases, rating
    pub fn features(&self) -> [f64; Self::WIDTH] {
        [
            self.view_count as f64,
            self.purchase_count as f64,
            self.rating,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.view_count == 0 && self.purchase_count == 0 && self.rating == 0.0
    }
}

/// Dense `users x products` grid of feature cells, stored row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFeatureMatrix {
    users: Vec<UserId>,
    products: Vec<ProductId>,
    cells: Vec<FeatureCell>,
}

impl UserFeatureMatrix {
    /// Build the matrix from the three per-signal maps
    ///
    /// Fails with `NonFiniteFeature` if a rating is NaN or infinite; every
    /// other value is taken as-is.
    #[instrument(skip_all)]
    pub fn build(
        views: &SignalMap<u64>,
        purchases: &SignalMap<u64>,
        ratings: &SignalMap<f64>,
    ) -> Result<Self> {
        // Outer join: every pair seen under any signal gets exactly one cell
        let mut joined: BTreeMap<(&UserId, &ProductId), FeatureCell> = BTreeMap::new();

        for (user, product, view_count) in triples(views) {
            joined.entry((user, product)).or_default().view_count = view_count;
        }
        for (user, product, purchase_count) in triples(purchases) {
            joined.entry((user, product)).or_default().purchase_count = purchase_count;
        }
        for (user, product, rating) in triples(ratings) {
            if !rating.is_finite() {
                return Err(SimilarityError::NonFiniteFeature {
                    feature: "rating",
                    user: user.to_string(),
                    product: product.to_string(),
                });
            }
            joined.entry((user, product)).or_default().rating = rating;
        }

        // Pivot
        let users: Vec<UserId> = joined
            .keys()
            .map(|(user, _)| *user)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        let products: Vec<ProductId> = joined
            .keys()
            .map(|(_, product)| *product)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let user_rows: HashMap<&UserId, usize> =
            users.iter().enumerate().map(|(i, u)| (u, i)).collect();
        let product_cols: HashMap<&ProductId, usize> =
            products.iter().enumerate().map(|(i, p)| (p, i)).collect();

        let mut cells = vec![FeatureCell::default(); users.len() * products.len()];
        for ((user, product), cell) in &joined {
            let row = user_rows[user];
            let col = product_cols[product];
            cells[row * products.len() + col] = *cell;
        }

        debug!(
            "Built feature matrix: {} users x {} products ({} observed pairs)",
            users.len(),
            products.len(),
            joined.len()
        );

        Ok(Self {
            users,
            products,
            cells,
        })
    }

    /// Build the matrix from a loaded interaction log
    pub fn from_log(log: &InteractionLog) -> Result<Self> {
        Self::build(log.views(), log.purchases(), log.ratings())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Users in row order
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Products in column order
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    /// Row index of a user
    pub fn user_position(&self, user: &UserId) -> Option<usize> {
        self.users.binary_search(user).ok()
    }

    /// Column index of a product
    pub fn product_position(&self, product: &ProductId) -> Option<usize> {
        self.products.binary_search(product).ok()
    }

    /// Cell at (row, column), if both are in range
    pub fn cell(&self, user: usize, product: usize) -> Option<&FeatureCell> {
        if user >= self.user_count() || product >= self.product_count() {
            return None;
        }
        self.cells.get(user * self.product_count() + product)
    }

    /// All cells for one user, in column order
    pub fn row(&self, user: usize) -> Option<&[FeatureCell]> {
        let width = self.product_count();
        if user >= self.user_count() {
            return None;
        }
        Some(&self.cells[user * width..(user + 1) * width])
    }

    /// Flattened feature vector of length `3 * product_count`
    pub fn user_vector(&self, user: usize) -> Option<Vec<f64>> {
        self.row(user)
            .map(|cells| cells.iter().flat_map(FeatureCell::features).collect())
    }
}

fn triples<V: Copy>(map: &SignalMap<V>) -> impl Iterator<Item = (&UserId, &ProductId, V)> {
    map.iter().flat_map(|(user, products)| {
        products
            .iter()
            .map(move |(product, value)| (user, product, *value))
    })
}
