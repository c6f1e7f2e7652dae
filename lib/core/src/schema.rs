//! Catalog schema
//!
//! Names the metadata fields the engine relies on. Resolved once when the
//! catalog is loaded, so ranking never has to guess at column names.

use crate::item::{AudienceTags, Item, Metadata};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogSchema {
    pub id_field: String,
    pub image_field: String,
    pub gender_field: Option<String>,
    pub usage_field: Option<String>,
    /// Fields concatenated into the text model's document for each item.
    /// `None` means every string or number field except the image reference.
    pub text_fields: Option<Vec<String>>,
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            image_field: "image_path".to_string(),
            gender_field: Some("gender".to_string()),
            usage_field: Some("usage".to_string()),
            text_fields: None,
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl CatalogSchema {
    /// Turn the catalog record at position `row` into an [`Item`].
    pub fn resolve(&self, row: usize, record: &Metadata) -> Result<Item> {
        let id = record
            .get(&self.id_field)
            .and_then(scalar_to_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::config(format!("catalog row {} has no `{}` value", row, self.id_field))
            })?;

        let image_path = record
            .get(&self.image_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let field = |name: &Option<String>| {
            name.as_ref()
                .and_then(|n| record.get(n))
                .and_then(scalar_to_string)
        };
        let audience = AudienceTags::new(
            field(&self.gender_field).as_deref(),
            field(&self.usage_field).as_deref(),
        );

        Ok(Item::new(id, row, image_path)
            .with_metadata(record.clone())
            .with_audience(audience))
    }

    /// Resolve a whole catalog, rejecting duplicate identifiers.
    pub fn resolve_all(&self, records: &[Metadata]) -> Result<Vec<Item>> {
        let mut seen = ahash::AHashSet::with_capacity(records.len());
        let mut items = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            let item = self.resolve(row, record)?;
            if !seen.insert(item.id.clone()) {
                return Err(Error::config(format!(
                    "duplicate item id `{}` at catalog row {}",
                    item.id, row
                )));
            }
            items.push(item);
        }
        Ok(items)
    }

    /// The text indexed for an item, in field order.
    pub fn document_text(&self, item: &Item) -> String {
        let parts: Vec<String> = match &self.text_fields {
            Some(fields) => fields
                .iter()
                .filter_map(|f| item.metadata.get(f))
                .filter_map(scalar_to_string)
                .collect(),
            None => item
                .metadata
                .iter()
                .filter(|(k, _)| **k != self.image_field)
                .filter_map(|(_, v)| scalar_to_string(v))
                .collect(),
        };
        parts.join(" ")
    }
}
