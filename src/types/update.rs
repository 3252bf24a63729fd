//! Partial-update types
//!
//! A `FieldUpdate` is the set of output fields computed for one work item;
//! the dispatcher merges them into a `BatchResult` keyed by record id.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Field name the record identifier is written under in a bulk update.
pub const ID_FIELD: &str = "Id";

/// The partial set of output fields computed for one record.
///
/// An update with no data fields means "nothing to write" and is dropped
/// before the bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl FieldUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// True when no data fields beyond the identifier have been produced.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten into one update-by-id record: `{"Id": ..., <field>: ..., ...}`.
    pub fn into_record(self) -> Map<String, Value> {
        let mut record = self.fields;
        record.insert(ID_FIELD.to_string(), Value::String(self.id));
        record
    }
}

/// Mapping from record id to the update computed for it, one entry per input
/// work item (including empty updates).
pub type BatchResult = HashMap<String, FieldUpdate>;
