//! Binding between structured document descriptions and the model.
//!
//! The structured form is a JSON tree; `to_model` validates it and reports
//! the offending field path on failure, `from_model` produces the canonical
//! form that `to_model` reads back unchanged.

mod decode;
mod encode;

use crate::error::Result;
use crate::model::Document;
use serde_json::Value;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Build a document from a structured description.
pub fn to_model(input: &Value) -> Result<Document> {
    let doc = decode::decode_document(input)?;
    log::debug!("Bound document with {} blocks", doc.body.len());
    Ok(doc)
}

/// Build a document from JSON text.
pub fn to_model_str(json: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(json)?;
    to_model(&value)
}

/// Produce the structured description of a document.
pub fn from_model(doc: &Document) -> Value {
    encode::encode_document(doc)
}

/// Produce the structured description as JSON text.
pub fn from_model_string(doc: &Document, format: JsonFormat) -> Result<String> {
    to_json_string(&from_model(doc), format)
}

/// Serialize any value in the requested format.
pub fn to_json_string<T: serde::Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let text = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(text)
}
