//! Record codec: schema text plus newline-delimited JSON decoding and encoding.
//!
//! The schema is a JSON record schema:
//!
//! ```json
//! {"type": "record", "name": "log", "fields": [{"name": "body", "type": "string"}]}
//! ```
//!
//! The decoder fills schema fields missing from a line with `null`; the
//! encoder writes exactly the schema fields, in schema order.

pub mod ndjson;

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::CodecError;

pub use ndjson::{NdjsonDecoder, NdjsonEncoder};

/// A single field declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: serde_json::Value,
}

/// Parsed record schema shared by the decoder and the encoder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub fields: Vec<SchemaField>,
}

impl RecordSchema {
    /// Parse and validate schema text.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let schema: RecordSchema =
            serde_json::from_str(text).map_err(|e| CodecError::Schema(e.to_string()))?;

        if schema.kind != "record" {
            return Err(CodecError::Schema(format!(
                "top-level type must be \"record\", got \"{}\"",
                schema.kind
            )));
        }

        let mut seen = HashSet::new();
        for field in &schema.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(CodecError::Schema(format!(
                    "duplicate field \"{}\"",
                    field.name
                )));
            }
        }

        Ok(schema)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}
