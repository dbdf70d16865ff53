//! Top-N query over a similarity matrix.
//!
//! Ranking is by descending similarity with ties broken by ascending
//! index, so the same matrix always answers the same way.
//!
//! `top_similar` keeps the queried row in its own result (usually first,
//! since the diagonal is 1.0). Callers that want neighbours only use
//! `top_similar_excluding_self`.

use crate::error::{Result, SimilarityError};
use crate::similarity_matrix::SimilarityMatrix;
use std::cmp::Ordering;

/// The `n` most similar rows to `user_index`, self included.
///
/// Returns `min(n, N)` indices. Fails with `EmptyModel` on a 0x0 matrix and
/// `InvalidIndex` when `user_index >= N`.
pub fn top_similar(matrix: &SimilarityMatrix, user_index: usize, n: usize) -> Result<Vec<usize>> {
    Ok(indices(rank(matrix, user_index, n, false)?))
}

/// Like `top_similar` but never returns `user_index` itself.
///
/// Returns `min(n, N - 1)` indices.
pub fn top_similar_excluding_self(
    matrix: &SimilarityMatrix,
    user_index: usize,
    n: usize,
) -> Result<Vec<usize>> {
    Ok(indices(rank(matrix, user_index, n, true)?))
}

/// Ranked `(index, similarity)` pairs under the same ordering
pub fn top_similar_scored(
    matrix: &SimilarityMatrix,
    user_index: usize,
    n: usize,
    include_self: bool,
) -> Result<Vec<(usize, f64)>> {
    rank(matrix, user_index, n, !include_self)
}

fn rank(
    matrix: &SimilarityMatrix,
    user_index: usize,
    n: usize,
    exclude_self: bool,
) -> Result<Vec<(usize, f64)>> {
    if matrix.is_empty() {
        return Err(SimilarityError::EmptyModel);
    }
    let row = matrix.row(user_index)?;

    let mut scored: Vec<(usize, f64)> = row
        .iter()
        .copied()
        .enumerate()
        .filter(|&(index, _)| !(exclude_self && index == user_index))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(n);
    Ok(scored)
}

fn indices(scored: Vec<(usize, f64)>) -> Vec<usize> {
    scored.into_iter().map(|(index, _)| index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 and 2 are twins, 1 is unrelated, 3 has no interactions
    fn sample() -> SimilarityMatrix {
        let values = vec![
            1.0, 0.2, 0.9, 0.0,
            0.2, 1.0, 0.2, 0.0,
            0.9, 0.2, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
        ];
        SimilarityMatrix::from_values(4, values).unwrap()
    }

    #[test]
    fn test_self_comes_first() {
        assert_eq!(top_similar(&sample(), 0, 2).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_ties_break_by_ascending_index() {
        // Row 1: 1.0 (self), then 0 and 2 tie at 0.2, then 3
        assert_eq!(top_similar(&sample(), 1, 4).unwrap(), vec![1, 0, 2, 3]);
        // Row 3 is all zeros: pure index order
        assert_eq!(top_similar(&sample(), 3, 4).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_n_larger_than_model_returns_everything() {
        assert_eq!(top_similar(&sample(), 2, 100).unwrap().len(), 4);
    }

    #[test]
    fn test_n_zero_returns_nothing() {
        assert!(top_similar(&sample(), 2, 0).unwrap().is_empty());
    }

    #[test]
    fn test_excluding_self() {
        assert_eq!(top_similar_excluding_self(&sample(), 0, 10).unwrap(), vec![2, 1, 3]);
        assert_eq!(top_similar_excluding_self(&sample(), 2, 1).unwrap(), vec![0]);
    }

    #[test]
    fn test_scored_results_are_non_increasing() {
        let scored = top_similar_scored(&sample(), 1, 4, true).unwrap();
        assert_eq!(scored[0], (1, 1.0));
        assert!(scored.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_invalid_index() {
        assert!(matches!(
            top_similar(&sample(), 4, 3),
            Err(SimilarityError::InvalidIndex { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_empty_model() {
        let empty = SimilarityMatrix::empty();
        assert!(matches!(top_similar(&empty, 0, 3), Err(SimilarityError::EmptyModel)));
        assert!(matches!(
            top_similar_excluding_self(&empty, 0, 0),
            Err(SimilarityError::EmptyModel)
        ));
    }
}
