//! The square, symmetric user-by-user similarity matrix.
//!
//! Once built (or decoded) the matrix is never mutated; it is shared
//! between request handlers behind an `Arc` and only read.

use crate::error::{Result, SimilarityError};
use serde::{Deserialize, Serialize};

/// Dense `N x N` cosine similarities, row-major.
///
/// Invariants, checked whenever a matrix is decoded:
/// - `values.len() == size * size`
/// - every value is finite and lies in `[-1, 1]`
/// - `values[i][j] == values[j][i]` exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

/// Unvalidated wire form
#[derive(Deserialize)]
struct RawMatrix {
    size: usize,
    values: Vec<f64>,
}

impl TryFrom<RawMatrix> for SimilarityMatrix {
    type Error = SimilarityError;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Self::from_values(raw.size, raw.values)
    }
}

impl SimilarityMatrix {
    /// The 0x0 matrix
    pub fn empty() -> Self {
        Self {
            size: 0,
            values: Vec::new(),
        }
    }

    /// Validate raw row-major values and wrap them
    pub fn from_values(size: usize, values: Vec<f64>) -> Result<Self> {
        let expected = size.checked_mul(size).ok_or_else(|| {
            SimilarityError::DeserializationFailure(format!("size {} overflows", size))
        })?;
        if values.len() != expected {
            return Err(SimilarityError::DeserializationFailure(format!(
                "expected {} values for a {}x{} matrix, found {}",
                expected,
                size,
                size,
                values.len()
            )));
        }

        for i in 0..size {
            for j in i..size {
                let value = values[i * size + j];
                if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                    return Err(SimilarityError::DeserializationFailure(format!(
                        "value {} at ({}, {}) is outside [-1, 1]",
                        value, i, j
                    )));
                }
                if value != values[j * size + i] {
                    return Err(SimilarityError::DeserializationFailure(format!(
                        "matrix is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        Ok(Self { size, values })
    }

    /// Used by the engine, which guarantees the invariants by construction
    pub(crate) fn from_symmetric_parts(size: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), size * size);
        Self { size, values }
    }

    /// Number of users (rows)
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// All values, row-major
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// One row of similarities
    pub fn row(&self, index: usize) -> Result<&[f64]> {
        if index >= self.size {
            return Err(SimilarityError::invalid_index(index, self.size));
        }
        Ok(&self.values[index * self.size..(index + 1) * self.size])
    }

    /// Similarity between users `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        if j >= self.size {
            return Err(SimilarityError::invalid_index(j, self.size));
        }
        Ok(self.row(i)?[j])
    }

    /// Convert a signed index (for example a user id cast to an integer)
    /// into a row index, rejecting negatives and anything past the end
    pub fn checked_index(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.size)
            .ok_or(SimilarityError::InvalidIndex {
                index,
                len: self.size,
            })
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| {
            (i + 1..self.size).all(|j| self.values[i * self.size + j] == self.values[j * self.size + i])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SimilarityMatrix {
        SimilarityMatrix::from_values(2, vec![1.0, 0.5, 0.5, 1.0]).unwrap()
    }

    #[test]
    fn test_accessors() {
        let m = sample();
        assert_eq!(m.len(), 2);
        assert_eq!(m.row(1).unwrap(), &[0.5, 1.0]);
        assert_eq!(m.get(0, 1).unwrap(), 0.5);
        assert!(m.is_symmetric());
    }

    #[test]
    fn test_out_of_range_access() {
        let m = sample();
        assert!(matches!(
            m.row(2),
            Err(SimilarityError::InvalidIndex { index: 2, len: 2 })
        ));
        assert!(matches!(
            m.get(0, 5),
            Err(SimilarityError::InvalidIndex { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_checked_index() {
        let m = sample();
        assert_eq!(m.checked_index(1).unwrap(), 1);
        assert!(matches!(
            m.checked_index(-1),
            Err(SimilarityError::InvalidIndex { index: -1, len: 2 })
        ));
        assert!(matches!(
            m.checked_index(2),
            Err(SimilarityError::InvalidIndex { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_rejects_non_square() {
        let result = SimilarityMatrix::from_values(2, vec![1.0, 0.0, 0.0]);
        assert!(matches!(
            result,
            Err(SimilarityError::DeserializationFailure(_))
        ));
    }

    #[test]
    fn test_rejects_asymmetric() {
        let result = SimilarityMatrix::from_values(2, vec![1.0, 0.5, 0.4, 1.0]);
        assert!(matches!(
            result,
            Err(SimilarityError::DeserializationFailure(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_and_nan() {
        for bad in [f64::NAN, 1.5, -2.0] {
            let result = SimilarityMatrix::from_values(1, vec![bad]);
            assert!(result.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_empty() {
        let m = SimilarityMatrix::empty();
        assert!(m.is_empty());
        assert!(m.is_symmetric());
        assert_eq!(SimilarityMatrix::from_values(0, vec![]).unwrap(), m);
    }
}
