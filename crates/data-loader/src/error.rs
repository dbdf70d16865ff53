//! Error types for the data-loader crate.
//!
//! Every variant that comes from a bad record carries enough context
//! (signal, user, product) to find the offending entry in the export.

use crate::types::Signal;
use thiserror::Error;

/// Errors that can occur while loading and validating interaction data
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The document is not valid JSON at all
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A present record is missing its numeric field or carries a bad value
    ///
    /// Absent pairs are fine (they become zero later), but a record that
    /// exists must be well-formed.
    #[error("Malformed {signal} record for user {user}, product {product}: {reason}")]
    MalformedInput {
        signal: Signal,
        user: String,
        product: String,
        reason: String,
    },

    /// A node in the document does not have the expected map/array layout
    #[error("Invalid shape at {path}: {reason}")]
    InvalidShape { path: String, reason: String },

    /// The same (user, product) pair was supplied twice for one signal
    #[error("Duplicate {signal} record for user {user}, product {product}")]
    DuplicateRecord {
        signal: Signal,
        user: String,
        product: String,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
