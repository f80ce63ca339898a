//! Extracted records

use crate::path::FieldPath;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured output of analysing one chunk, one document, or a whole project
///
/// A record is a map of named [`Value`]s. Chunk records are transient; document
/// records and project baselines are persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord {
    fields: BTreeMap<String, Value>,
}

impl ExtractedRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing field map
    pub fn from_map(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a record whose top-level sections are empty maps
    ///
    /// Each path gets an empty map at its position, and `empty_list` (if
    /// given) gets an empty array. This is the well-typed "nothing found"
    /// record handed to the merger when a chunk could not be analysed.
    pub fn skeleton(sections: &[String], empty_list: Option<&FieldPath>) -> Self {
        let mut record = Self::new();
        for section in sections {
            record.fields.insert(section.clone(), Value::empty_map());
        }
        if let Some(path) = empty_list {
            record.set_path(path, Value::empty_array());
        }
        record
    }

    /// Parse a record from JSON text; the top level must be an object
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Map(fields)) => Ok(Self { fields }),
            Ok(other) => Err(format!("Expected a JSON object, found {}", other.kind())),
            Err(e) => Err(format!("Invalid JSON: {}", e)),
        }
    }

    /// Serialize to compact JSON text
    pub fn to_json_string(&self) -> String {
        let json: serde_json::Value = Value::Map(self.fields.clone()).into();
        json.to_string()
    }

    /// Serialize to indented JSON text
    pub fn to_json_pretty(&self) -> String {
        let json: serde_json::Value = Value::Map(self.fields.clone()).into();
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
    }

    /// Borrow the top-level fields
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Mutably borrow the top-level fields
    pub fn as_map_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.fields
    }

    /// Consume the record, returning its fields
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.fields
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when there are no top-level fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a top-level field
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Follow a dotted path through nested maps
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get(first)?;
        for segment in rest {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Follow a dotted path mutably
    pub fn get_path_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.fields.get_mut(first)?;
        for segment in rest {
            current = current.as_map_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    /// Set the value at a dotted path, creating intermediate maps
    ///
    /// Intermediate values that are not maps are replaced by maps. Setting the
    /// root path is a no-op.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };

        let mut fields = &mut self.fields;
        for segment in parents {
            let entry = fields
                .entry(segment.clone())
                .or_insert_with(Value::empty_map);
            if !matches!(entry, Value::Map(_)) {
                *entry = Value::empty_map();
            }
            let Value::Map(inner) = entry else {
                return;
            };
            fields = inner;
        }
        fields.insert(last.clone(), value);
    }
}

impl From<BTreeMap<String, Value>> for ExtractedRecord {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self::from_map(fields)
    }
}
