//! Error types for the similarity crate.

use thiserror::Error;

/// Errors raised while building, querying or (de)serializing a model
#[derive(Error, Debug)]
pub enum SimilarityError {
    /// Row or column index outside `[0, len)`
    #[error("Index {index} is out of range for a model with {len} users")]
    InvalidIndex { index: i64, len: usize },

    /// Query against a 0x0 model
    #[error("The similarity model is empty")]
    EmptyModel,

    /// A feature value that cannot take part in a cosine (NaN or infinite)
    #[error("Non-finite {feature} for user {user}, product {product}")]
    NonFiniteFeature {
        feature: &'static str,
        user: String,
        product: String,
    },

    /// Artifact bytes do not decode into a valid model
    #[error("Failed to deserialize model: {0}")]
    DeserializationFailure(String),

    /// Artifact could not be encoded
    #[error("Failed to serialize model: {0}")]
    SerializationFailure(String),

    /// I/O error while reading or writing an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimilarityError {
    pub(crate) fn invalid_index(index: usize, len: usize) -> Self {
        SimilarityError::InvalidIndex {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len,
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, SimilarityError>;
