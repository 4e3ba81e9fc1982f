//! MISO response parser
//!
//! Every MISO data endpoint wraps its rows in the same envelope:
//!
//! ```json
//! { "data": [ { "interval": "1", "node": "MINN.HUB", "lmp": 21.4 }, ... ] }
//! ```
//!
//! Row fields are opaque to this crate; they are carried through as JSON
//! values in a [`Table`].

use crate::fetcher::{FetcherError, FetcherResult};
use crate::Table;
use serde_json::Value;

/// Stateless parser for MISO API responses
pub struct MisoParser;

impl MisoParser {
    /// Parse a raw response body into a table
    ///
    /// # Errors
    /// Returns `FetcherError::Parse` when the body is not JSON, has no `data`
    /// array, contains non-object rows, or holds zero rows.
    pub fn parse_body(body: &[u8]) -> FetcherResult<Table> {
        let envelope: Value = serde_json::from_slice(body)
            .map_err(|e| FetcherError::Parse(format!("Malformed JSON: {e}")))?;
        Self::parse_envelope(envelope)
    }

    /// Parse an already-decoded envelope
    pub fn parse_envelope(envelope: Value) -> FetcherResult<Table> {
        let mut envelope = match envelope {
            Value::Object(map) => map,
            other => {
                return Err(FetcherError::Parse(format!(
                    "Expected JSON object envelope, got {}",
                    json_type(&other)
                )))
            }
        };

        let data = envelope
            .remove("data")
            .ok_or_else(|| FetcherError::Parse("Missing 'data' key".to_string()))?;

        let items = match data {
            Value::Array(items) => items,
            other => {
                return Err(FetcherError::Parse(format!(
                    "'data' must be an array, got {}",
                    json_type(&other)
                )))
            }
        };

        // A day with no rows cannot be told apart from a missing day downstream
        if items.is_empty() {
            return Err(FetcherError::Parse(
                "Response contained no rows".to_string(),
            ));
        }

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(record) => records.push(record),
                other => {
                    return Err(FetcherError::Parse(format!(
                        "Row {idx} is not an object ({})",
                        json_type(&other)
                    )))
                }
            }
        }

        Ok(Table::from_records(records))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
