//! Similarity Engine: pairwise cosine similarity between users.
//!
//! ## Algorithm
//! 1. Flatten each user's row into a `3 * products` vector
//! 2. Scale each vector to unit length (rescaled by its largest component
//!    first, so large counts cannot overflow the squared norm)
//! 3. For every pair `i <= j`, similarity is the dot product of the unit
//!    vectors, clamped to `[-1, 1]`
//! 4. Mirror the upper triangle into the lower one
//!
//! An all-zero vector has no direction, so every pair involving it
//! (its own diagonal included) is 0. Non-zero rows have a diagonal of
//! exactly 1.0.
//!
//! Rows of the upper triangle are independent, which makes them the unit
//! of work for Rayon. Each entry is computed by the same kernel in both
//! modes, so parallel and sequential results are bit-identical.

use crate::matrix::UserFeatureMatrix;
use crate::similarity_matrix::SimilarityMatrix;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, instrument};

/// How the O(N^2) pass is scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Execution {
    Sequential,
    /// Partition by row across the Rayon pool
    #[default]
    Parallel,
}

/// Compute the user-by-user similarity matrix using the Rayon pool
pub fn compute_similarity(matrix: &UserFeatureMatrix) -> SimilarityMatrix {
    compute_similarity_with(matrix, Execution::default())
}

/// Compute the user-by-user similarity matrix with an explicit schedule
#[instrument(
    skip(matrix),
    fields(users = matrix.user_count(), products = matrix.product_count())
)]
pub fn compute_similarity_with(
    matrix: &UserFeatureMatrix,
    execution: Execution,
) -> SimilarityMatrix {
    let start = Instant::now();
    let n = matrix.user_count();

    // `None` marks a zero vector
    let units: Vec<Option<Vec<f64>>> = (0..n)
        .map(|user| matrix.user_vector(user).and_then(unit_vector))
        .collect();

    let upper_row = |i: usize| -> Vec<f64> {
        (i..n).map(|j| cosine(i, j, &units)).collect()
    };

    let upper: Vec<Vec<f64>> = match execution {
        Execution::Sequential => (0..n).map(upper_row).collect(),
        Execution::Parallel => (0..n).into_par_iter().map(upper_row).collect(),
    };

    let mut values = vec![0.0; n * n];
    for (i, row) in upper.into_iter().enumerate() {
        for (offset, similarity) in row.into_iter().enumerate() {
            let j = i + offset;
            values[i * n + j] = similarity;
            values[j * n + i] = similarity;
        }
    }

    debug!(
        "Computed {}x{} similarity matrix in {:.2?}",
        n,
        n,
        start.elapsed()
    );
    SimilarityMatrix::from_symmetric_parts(n, values)
}

/// Per-entry kernel shared by both schedules
fn cosine(i: usize, j: usize, units: &[Option<Vec<f64>>]) -> f64 {
    match (&units[i], &units[j]) {
        (Some(_), Some(_)) if i == j => 1.0,
        (Some(u), Some(v)) => {
            let similarity = dot(u, v).clamp(-1.0, 1.0);
            // Fold -0.0 into 0.0 so ties rank by index
            if similarity == 0.0 { 0.0 } else { similarity }
        }
        _ => 0.0,
    }
}

fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(a, b)| a * b).sum()
}

/// Direction of `v` as a unit vector, or `None` for the zero vector
fn unit_vector(v: Vec<f64>) -> Option<Vec<f64>> {
    let scale = v.iter().fold(0.0_f64, |max, x| max.max(x.abs()));
    if scale == 0.0 {
        return None;
    }
    let norm = v.iter().map(|x| (x / scale).powi(2)).sum::<f64>().sqrt();
    let divisor = scale * norm;
    Some(v.into_iter().map(|x| x / divisor).collect())
}
