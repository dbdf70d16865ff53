//! Loading an `InteractionLog` from an exported JSON document.
//!
//! The three sections are independent, so they are parsed in parallel
//! with nested `rayon::join` calls once the document is in memory.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, instrument};

impl InteractionLog {
    /// Load the interaction export from a JSON file
    ///
    /// Steps:
    /// 1. Read the file into memory
    /// 2. Parse it as a JSON document
    /// 3. Parse the views, purchases and ratings sections in parallel
    #[instrument]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading interaction data from {:?}", path);

        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DataLoadError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => DataLoadError::IoError(e),
        })?;

        let log = Self::from_json_str(&text)?;

        let (views, purchases, ratings) = log.counts();
        info!(
            "Loaded {} views, {} purchases, {} ratings",
            views, purchases, ratings
        );
        Ok(log)
    }

    /// Parse an in-memory export
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_json_value(&document)
    }

    /// Parse an already-decoded export document
    ///
    /// A `null` document (an export of an empty database) yields an empty log.
    pub fn from_json_value(document: &Value) -> Result<Self> {
        let sections = match document {
            Value::Null => return Ok(Self::new()),
            Value::Object(sections) => sections,
            _ => {
                return Err(DataLoadError::InvalidShape {
                    path: "$".to_string(),
                    reason: "expected an object with views, purchases and ratings".to_string(),
                });
            }
        };

        let views_section = parser::section(sections, Signal::View);
        let purchases_section = parser::section(sections, Signal::Purchase);
        let ratings_section = parser::section(sections, Signal::Rating);

        let ((views, purchases), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_views(views_section),
                    || parser::parse_purchases(purchases_section),
                )
            },
            || parser::parse_ratings(ratings_section),
        );

        let log = Self::from_signals(views?, purchases?, ratings?);
        debug!("Parsed {} records", log.record_count());
        Ok(log)
    }
}
