//! Schema defaults
//!
//! A [`Schema`] carries the default shape (`model`) for documents in one
//! table and builds instances by deep-merging a partial document over a
//! copy of that model. The engine only ever reads the schema.

use docket_core::{Document, Result};

/// Default document shape for a table
#[derive(Debug, Clone)]
pub struct Schema {
    model: Document,
}

impl Schema {
    /// Create a schema from its default document
    ///
    /// The model must satisfy the root-container rule.
    pub fn new(model: impl Into<Document>) -> Result<Self> {
        let model = model.into();
        model.ensure_container()?;
        Ok(Schema { model })
    }

    /// The default document shape
    pub fn model(&self) -> &Document {
        &self.model
    }

    /// Deep-merge `partial` over a copy of the model
    ///
    /// Merge semantics: objects merge recursively, a `null` in the partial
    /// removes the field, anything else replaces the model's value.
    pub fn instance(&self, partial: &Document) -> Document {
        let mut doc = self.model.clone();
        merge_into(doc.as_inner_mut(), partial.as_inner());
        doc
    }
}

fn merge_into(target: &mut serde_json::Value, patch: &serde_json::Value) {
    if let serde_json::Value::Object(patch_map) = patch {
        if !target.is_object() {
            *target = serde_json::Value::Object(serde_json::Map::new());
        }
        if let serde_json::Value::Object(target_map) = target {
            for (key, value) in patch_map {
                if value.is_null() {
                    target_map.remove(key);
                } else if let Some(slot) = target_map.get_mut(key) {
                    merge_into(slot, value);
                } else {
                    target_map.insert(key.clone(), value.clone());
                }
            }
        }
    } else {
        *target = patch.clone();
    }
}
