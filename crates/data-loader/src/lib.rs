//! # Data Loader Crate
//!
//! This crate loads the exported interaction data (product views,
//! purchases and ratings) and turns it into a validated `InteractionLog`.
//!
//! ## Main Components
//!
//! - **types**: Identifiers, signals, records and the `InteractionLog`
//! - **parser**: Walk the JSON export and validate every record
//! - **loader**: Read an export from disk and parse its sections in parallel
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::InteractionLog;
//! use std::path::Path;
//!
//! let log = InteractionLog::load_from_file(Path::new("userData.json"))?;
//! let (views, purchases, ratings) = log.counts();
//! println!("{views} views, {purchases} purchases, {ratings} ratings");
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod loader;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use types::{
    // Identifiers
    EntityId,
    UserId,
    ProductId,
    // Signals and records
    Signal,
    InteractionRecord,
    SignalMap,
    InteractionLog,
};
