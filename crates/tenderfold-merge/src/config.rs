//! Configuration for the merge engine

use serde::{Deserialize, Serialize};
use tenderfold_domain::{FieldPath, Value};

/// Configuration shared by every merge component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Where the product list lives in a record
    pub product_list_path: FieldPath,

    /// Value written when a field is known to be wrong
    pub sentinel: String,

    /// Scalar values that carry no information (compared case-insensitively)
    pub placeholders: Vec<String>,

    /// OEM value meaning "manufacturer not stated"
    pub unspecified_oem: String,

    /// Product reconciliation settings
    pub reconcile: ReconcileConfig,

    /// Monetary consistency check settings
    pub consistency: ConsistencyConfig,
}

/// Thresholds for product identity resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Minimum name similarity for two entries to be the same product
    pub name_threshold: f64,

    /// Minimum OEM similarity when both OEMs are known
    pub oem_threshold: f64,

    /// Name similarity at which differing OEMs are ignored
    pub strong_name_threshold: f64,

    /// Maximum entries kept after reconciliation
    pub max_entries: usize,
}

/// Deposit vs contract value sanity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Run the check at all
    pub enabled: bool,

    /// Path of the deposit-like amount (EMD)
    pub deposit_path: FieldPath,

    /// Path of the contract-value-like amount (bid value)
    pub contract_value_path: FieldPath,

    /// Amounts closer than this are considered equal
    pub epsilon: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            product_list_path: path("productMapping.miiProductStatus"),
            sentinel: "unknown".to_string(),
            placeholders: vec!["N/A".to_string()],
            unspecified_oem: "Unspecified".to_string(),
            reconcile: ReconcileConfig::default(),
            consistency: ConsistencyConfig::default(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            name_threshold: 0.85,
            oem_threshold: 0.5,
            strong_name_threshold: 0.95,
            max_entries: 200,
        }
    }
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deposit_path: path("projectOverview.emd"),
            contract_value_path: path("projectOverview.bidValue"),
            epsilon: 0.01,
        }
    }
}

fn path(s: &str) -> FieldPath {
    FieldPath::parse(s).unwrap_or_default()
}

impl MergeConfig {
    /// True if the text is the sentinel or a configured placeholder
    pub fn is_placeholder(&self, text: &str) -> bool {
        let text = text.trim();
        text.eq_ignore_ascii_case(&self.sentinel)
            || self
                .placeholders
                .iter()
                .any(|p| text.eq_ignore_ascii_case(p.trim()))
    }

    /// True if a scalar value may overwrite another during a merge
    ///
    /// `Null`, blank strings and placeholders carry no information; numbers
    /// and booleans always do.
    pub fn is_informative(&self, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty() && !self.is_placeholder(s),
            Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Map(_) => true,
        }
    }

    /// True if an OEM value means "manufacturer unknown"
    pub fn is_unspecified_oem(&self, oem: &str) -> bool {
        let oem = oem.trim();
        oem.is_empty() || oem.eq_ignore_ascii_case(&self.unspecified_oem) || self.is_placeholder(oem)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.product_list_path.is_root() {
            return Err("product_list_path must not be empty".to_string());
        }
        if self.sentinel.trim().is_empty() {
            return Err("sentinel must not be empty".to_string());
        }
        self.reconcile.validate()?;
        self.consistency.validate()?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl ReconcileConfig {
    /// Strict preset: only near-identical names are merged
    pub fn strict() -> Self {
        Self {
            name_threshold: 0.95,
            oem_threshold: 0.8,
            strong_name_threshold: 0.99,
            max_entries: 200,
        }
    }

    /// Validate the thresholds
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("name_threshold", self.name_threshold),
            ("oem_threshold", self.oem_threshold),
            ("strong_name_threshold", self.strong_name_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0", name));
            }
        }
        if self.strong_name_threshold < self.name_threshold {
            return Err("strong_name_threshold cannot be below name_threshold".to_string());
        }
        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl ConsistencyConfig {
    /// Validate the check settings
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.deposit_path.is_root() || self.contract_value_path.is_root() {
            return Err("consistency field paths must not be empty".to_string());
        }
        if self.deposit_path == self.contract_value_path {
            return Err("deposit_path and contract_value_path must differ".to_string());
        }
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err("epsilon must be non-negative".to_string());
        }
        Ok(())
    }
}
