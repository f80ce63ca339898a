//! Product line items

use crate::value::Value;
use std::collections::BTreeMap;

/// Field names used for product entries inside a record
pub mod keys {
    /// Product name
    pub const NAME: &str = "productName";
    /// Alternative name key some extractions emit
    pub const NAME_ALT: &str = "name";
    /// Product category
    pub const CATEGORY: &str = "category";
    /// Free-text technical specifications
    pub const SPECIFICATIONS: &str = "specifications";
    /// Quantity as written in the document
    pub const QUANTITY: &str = "quantity";
    /// Unit of measure
    pub const UNIT: &str = "unit";
    /// Original equipment manufacturer
    pub const OEM: &str = "oem";
    /// Model name or number
    pub const MODEL: &str = "model";
    /// Classification status
    pub const STATUS: &str = "status";
    /// Legacy status key
    pub const STATUS_ALT: &str = "miiStatus";
    /// Extraction confidence score
    pub const CONFIDENCE: &str = "confidence";
    /// Where the entry came from
    pub const SOURCE: &str = "source";
}

/// One line item from a bill of quantities or product list
///
/// Entries are read from and written back to map values inside a record.
/// Fields the entry does not model are kept in `raw` and survive a round
/// trip, and typed fields are only written back when they changed, so an
/// untouched entry serializes to exactly what it was read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductEntry {
    /// Product name as written in the document
    pub name: String,
    /// Category (e.g. "HVAC", "Electronics")
    pub category: String,
    /// Technical specifications, free text
    pub specifications: String,
    /// Quantity
    pub quantity: String,
    /// Unit of measure
    pub unit: String,
    /// Manufacturer; empty or a placeholder when unknown
    pub oem: String,
    /// Model
    pub model: String,
    /// Classification status
    pub status: String,
    /// Confidence score
    pub confidence: f64,
    /// Origin of the entry (e.g. "ai-extraction", "fallback-extraction")
    pub source: String,
    raw: BTreeMap<String, Value>,
}

impl ProductEntry {
    /// Create an entry with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the manufacturer
    pub fn with_oem(mut self, oem: impl Into<String>) -> Self {
        self.oem = oem.into();
        self
    }

    /// Set the specifications
    pub fn with_specifications(mut self, specifications: impl Into<String>) -> Self {
        self.specifications = specifications.into();
        self
    }

    /// Set the confidence score
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set quantity and unit
    pub fn with_quantity(mut self, quantity: impl Into<String>, unit: impl Into<String>) -> Self {
        self.quantity = quantity.into();
        self.unit = unit.into();
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the source tag
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attach a field that has no typed counterpart
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.raw.insert(key.into(), value);
        self
    }

    /// Name case-folded and trimmed, the identity key
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Read an entry from a map value; other variants yield `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let name = read_str(map, keys::NAME)
            .filter(|s| !s.is_empty())
            .or_else(|| read_str(map, keys::NAME_ALT))
            .unwrap_or_default();

        Some(Self {
            name,
            category: read_str(map, keys::CATEGORY).unwrap_or_default(),
            specifications: read_str(map, keys::SPECIFICATIONS).unwrap_or_default(),
            quantity: read_str(map, keys::QUANTITY).unwrap_or_default(),
            unit: read_str(map, keys::UNIT).unwrap_or_default(),
            oem: read_str(map, keys::OEM).unwrap_or_default(),
            model: read_str(map, keys::MODEL).unwrap_or_default(),
            status: read_str(map, keys::STATUS)
                .or_else(|| read_str(map, keys::STATUS_ALT))
                .unwrap_or_default(),
            confidence: map
                .get(keys::CONFIDENCE)
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            source: read_str(map, keys::SOURCE).unwrap_or_default(),
            raw: map.clone(),
        })
    }

    /// Write the entry back as a map value
    pub fn to_value(&self) -> Value {
        let mut map = self.raw.clone();

        let name_key = if !map.contains_key(keys::NAME) && map.contains_key(keys::NAME_ALT) {
            keys::NAME_ALT
        } else {
            keys::NAME
        };
        let status_key = if !map.contains_key(keys::STATUS) && map.contains_key(keys::STATUS_ALT) {
            keys::STATUS_ALT
        } else {
            keys::STATUS
        };

        write_str(&mut map, name_key, &self.name);
        write_str(&mut map, keys::CATEGORY, &self.category);
        write_str(&mut map, keys::SPECIFICATIONS, &self.specifications);
        write_str(&mut map, keys::QUANTITY, &self.quantity);
        write_str(&mut map, keys::UNIT, &self.unit);
        write_str(&mut map, keys::OEM, &self.oem);
        write_str(&mut map, keys::MODEL, &self.model);
        write_str(&mut map, status_key, &self.status);
        write_str(&mut map, keys::SOURCE, &self.source);

        let current = map.get(keys::CONFIDENCE).and_then(Value::as_f64);
        let unchanged = match current {
            Some(existing) => existing == self.confidence,
            None => self.confidence == 0.0,
        };
        if !unchanged {
            map.insert(keys::CONFIDENCE.to_string(), Value::Number(self.confidence));
        }

        Value::Map(map)
    }
}

/// Read a field as text; numbers and booleans are rendered
fn read_str(map: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => map.get(key).map(Value::to_display_string),
        _ => None,
    }
}

/// Write a text field unless the map already reads as that text
fn write_str(map: &mut BTreeMap<String, Value>, key: &str, value: &str) {
    let current = read_str(map, key);
    match current {
        Some(existing) if existing == value => {}
        None if value.is_empty() => {}
        _ => {
            map.insert(key.to_string(), Value::string(value));
        }
    }
}
