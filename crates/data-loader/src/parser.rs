//! Parser for the exported interaction document.
//!
//! The export has three top-level sections, each shaped
//! `user -> product -> { <field>: <number> }`:
//! - views:     `{ "viewCount": 5 }`
//! - purchases: `{ "purchaseCount": 1 }`
//! - ratings:   `{ "rating": 4.5 }`
//!
//! The realtime database behind the export writes a node whose keys are
//! sequential integers as a JSON array, so both map and array nodes are
//! accepted. A `null` section, user node or array slot means "no data"; a
//! `null` where a record object belongs is malformed.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use serde_json::{Map, Value};

/// Parse the views section into a signal map
pub fn parse_views(section: &Value) -> Result<SignalMap<u64>> {
    parse_signal(section, Signal::View, parse_count)
}

/// Parse the purchases section into a signal map
pub fn parse_purchases(section: &Value) -> Result<SignalMap<u64>> {
    parse_signal(section, Signal::Purchase, parse_count)
}

/// Parse the ratings section into a signal map
pub fn parse_ratings(section: &Value) -> Result<SignalMap<f64>> {
    parse_signal(section, Signal::Rating, parse_rating)
}

/// Look up a top-level section; a missing section is treated like `null`
pub fn section<'a>(document: &'a Map<String, Value>, signal: Signal) -> &'a Value {
    document.get(signal.section()).unwrap_or(&Value::Null)
}

fn parse_signal<V>(
    section: &Value,
    signal: Signal,
    parse_field: fn(&Value) -> std::result::Result<V, String>,
) -> Result<SignalMap<V>> {
    let mut map = SignalMap::new();

    for (user, products) in children(section, signal.section())? {
        let path = format!("{}.{}", signal.section(), user);
        for (product, record) in children(products, &path)? {
            let value = parse_record(record, signal, parse_field).map_err(|reason| {
                DataLoadError::MalformedInput {
                    signal,
                    user: user.clone(),
                    product: product.clone(),
                    reason,
                }
            })?;

            map.entry(UserId::new(user.as_str()))
                .or_default()
                .insert(ProductId::new(product), value);
        }
    }

    Ok(map)
}

/// Key/value pairs of a map or array node.
///
/// Only arrays have `null` gaps; a `null` under a map key is passed on and
/// rejected by whoever expected a record there.
fn children<'a>(node: &'a Value, path: &str) -> Result<Vec<(String, &'a Value)>> {
    match node {
        Value::Null => Ok(Vec::new()),
        Value::Object(entries) => Ok(entries
            .iter()
            .map(|(key, value)| (key.clone(), value))
            .collect()),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(idx, value)| (idx.to_string(), value))
            .collect()),
        other => Err(DataLoadError::InvalidShape {
            path: path.to_string(),
            reason: format!("expected an object or array, found {}", kind(other)),
        }),
    }
}

fn parse_record<V>(
    record: &Value,
    signal: Signal,
    parse_field: fn(&Value) -> std::result::Result<V, String>,
) -> std::result::Result<V, String> {
    let fields = record
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", kind(record)))?;

    let value = fields
        .get(signal.field())
        .ok_or_else(|| format!("missing field {}", signal.field()))?;

    parse_field(value).map_err(|reason| format!("{}: {}", signal.field(), reason))
}

/// Counts must be non-negative integers; `5.0` is accepted, `5.5` is not
fn parse_count(value: &Value) -> std::result::Result<u64, String> {
    if let Some(count) = value.as_u64() {
        return Ok(count);
    }

    match value.as_f64() {
        Some(n) if n < 0.0 => Err(format!("negative count {}", n)),
        // u64::MAX rounds up to 2^64 as an f64, so the bound is exclusive
        Some(n) if n.fract() == 0.0 && n < u64::MAX as f64 => Ok(n as u64),
        Some(n) => Err(format!("expected a non-negative integer, found {}", n)),
        None => Err(format!("expected a number, found {}", kind(value))),
    }
}

fn parse_rating(value: &Value) -> std::result::Result<f64, String> {
    match value.as_f64() {
        Some(rating) if rating.is_finite() => Ok(rating),
        Some(rating) => Err(format!("non-finite rating {}", rating)),
        None => Err(format!("expected a number, found {}", kind(value))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
