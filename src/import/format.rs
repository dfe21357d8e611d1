//! Import and export formats.
//!
//! Only JSON is built in. A JSON source holds either one item document or an
//! array of them; export always writes an array.

use crate::models::ItemDocument;
use crate::{Error, Result};
use serde_json::Value;

/// Reads candidate items from raw text.
pub trait ImportFormat {
    fn name(&self) -> &'static str;

    /// Parse every top-level item of the source, in order.
    fn parse(&self, raw: &str) -> Result<Vec<ItemDocument>>;
}

/// Writes items to text.
pub trait ExportFormat {
    fn name(&self) -> &'static str;

    fn render(&self, items: &[ItemDocument]) -> Result<String>;
}

/// JSON documents as written by `mw export`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl ImportFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, raw: &str) -> Result<Vec<ItemDocument>> {
        let value: Value = serde_json::from_str(raw)?;
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(Error::from))
                .collect(),
            Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
            _ => Err(Error::InvalidInput(
                "expected an item object or an array of items".to_string(),
            )),
        }
    }
}

impl ExportFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&self, items: &[ItemDocument]) -> Result<String> {
        Ok(serde_json::to_string_pretty(items)?)
    }
}

/// Look up an import format by name.
pub fn import_format(name: &str) -> Option<Box<dyn ImportFormat>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(JsonFormat)),
        _ => None,
    }
}

/// Look up an export format by name.
pub fn export_format(name: &str) -> Option<Box<dyn ExportFormat>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(JsonFormat)),
        _ => None,
    }
}
