//! The universal shape of extracted data
//!
//! Every record the extraction capability produces is a tree of [`Value`]s.
//! Merge rules pattern-match on the variants instead of probing untyped
//! structures, so a type mismatch between two records is a named case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single extracted value
///
/// Maps use `BTreeMap` so that structural equality and serialization are
/// independent of key insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// Explicit absence of a value
    #[default]
    Null,
    /// Boolean flag
    Bool(bool),
    /// Any numeric value
    Number(f64),
    /// Free text
    String(String),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Named sub-fields
    Map(BTreeMap<String, Value>),
}

/// Variant tag of a [`Value`], used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `Value::Null`
    Null,
    /// `Value::Bool`
    Bool,
    /// `Value::Number`
    Number,
    /// `Value::String`
    String,
    /// `Value::Array`
    Array,
    /// `Value::Map`
    Map,
}

impl ValueKind {
    /// How structured this kind is: maps outrank arrays, arrays outrank scalars
    pub fn structure_rank(self) -> u8 {
        match self {
            ValueKind::Map => 2,
            ValueKind::Array => 1,
            ValueKind::Null | ValueKind::Bool | ValueKind::Number | ValueKind::String => 0,
        }
    }

    /// Lowercase name for log output
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Create an empty map value
    pub fn empty_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array value
    pub fn empty_array() -> Self {
        Value::Array(Vec::new())
    }

    /// Variant tag
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// True for every variant except arrays and maps
    pub fn is_scalar(&self) -> bool {
        self.kind().structure_rank() == 0
    }

    /// True for `Null` and for strings that are empty after trimming
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Borrow the string content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content; numeric strings are parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow the items, if this is an array
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the fields, if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Mutably borrow the fields, if this is a map
    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Render a scalar the way it reads in a document; containers render as JSON
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            container => {
                let json: serde_json::Value = container.clone().into();
                write!(f, "{}", json)
            }
        }
    }
}

/// Whole numbers print without a fractional part
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(n as i64)
                } else {
                    serde_json::Number::from_f64(n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Map(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structure_rank_ordering() {
        assert!(ValueKind::Map.structure_rank() > ValueKind::Array.structure_rank());
        assert!(ValueKind::Array.structure_rank() > ValueKind::String.structure_rank());
        assert_eq!(ValueKind::Null.structure_rank(), ValueKind::Number.structure_rank());
    }

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::string("   ").is_blank());
        assert!(!Value::string("x").is_blank());
        assert!(!Value::Number(0.0).is_blank());
        assert!(!Value::empty_array().is_blank());
    }

    #[test]
    fn test_from_json_keeps_structure() {
        let value = Value::from(json!({
            "projectOverview": {"bidValue": "₹10,00,000", "items": [1, 2.5, true, null]}
        }));

        let overview = value.as_map().unwrap()["projectOverview"].as_map().unwrap();
        assert_eq!(overview["bidValue"].as_str(), Some("₹10,00,000"));
        let items = overview["items"].as_array().unwrap();
        assert_eq!(items[0], Value::Number(1.0));
        assert_eq!(items[2], Value::Bool(true));
        assert_eq!(items[3], Value::Null);
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let json: serde_json::Value = Value::Number(42.0).into();
        assert_eq!(json, json!(42));

        let json: serde_json::Value = Value::Number(0.5).into();
        assert_eq!(json, json!(0.5));
    }

    #[test]
    fn test_serde_through_json_text() {
        let value: Value = serde_json::from_str(r#"{"a": ["x", {"b": 2}]}"#).unwrap();
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":["x",{"b":2}]}"#);
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(Value::string("Daikin").to_display_string(), "Daikin");
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(Value::Bool(false).to_display_string(), "false");
        assert_eq!(
            Value::Array(vec![Value::string("a")]).to_display_string(),
            r#"["a"]"#
        );
    }

    #[test]
    fn test_numeric_string_as_f64() {
        assert_eq!(Value::string(" 12.5 ").as_f64(), Some(12.5));
        assert_eq!(Value::string("twelve").as_f64(), None);
    }
}
