//! # Similarity Crate
//!
//! This crate turns an `InteractionLog` into a user-similarity model and
//! answers nearest-neighbour queries against it.
//!
//! ## Components
//!
//! ### Matrix Builder
//! Fuses views, purchases and ratings into a dense user-by-product matrix
//! of `(view_count, purchase_count, rating)` cells, zero-filled for pairs
//! with no data, in a deterministic row/column order.
//!
//! ### Similarity Engine
//! - Build: cosine similarity between every pair of flattened user rows,
//!   computed on the upper triangle (in parallel) and mirrored
//! - Query: top-N most similar users for a row, ties broken by index
//!
//! ### Model Store
//! bincode artifact holding the matrix and its row labels, validated on load.
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::InteractionLog;
//! use similarity::{store, top_similar, train};
//!
//! // Offline
//! let log = InteractionLog::load_from_file(Path::new("userData.json"))?;
//! let artifact = train(&log)?;
//! store::save(&artifact, Path::new("recommendation_model.bin"))?;
//!
//! // Online
//! let artifact = store::load(Path::new("recommendation_model.bin"))?;
//! let neighbours = top_similar(artifact.similarity(), 0, 10)?;
//! ```

// Public modules
pub mod error;
pub mod matrix;
pub mod similarity_matrix;
pub mod engine;
pub mod query;
pub mod store;
pub mod trainer;

// Re-export commonly used types
pub use error::{Result, SimilarityError};
pub use matrix::{FeatureCell, UserFeatureMatrix};
pub use similarity_matrix::SimilarityMatrix;
pub use engine::{Execution, compute_similarity, compute_similarity_with};
pub use query::{top_similar, top_similar_excluding_self, top_similar_scored};
pub use store::ModelArtifact;
pub use trainer::{train, train_with};
