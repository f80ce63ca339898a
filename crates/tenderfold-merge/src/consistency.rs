//! Financial sanity check between the deposit and the contract value
//!
//! Extraction sometimes copies the earnest money deposit into the bid value
//! field. When the two amounts are equal the bid value is wrong, so it is reset
//! to the sentinel.

use crate::config::MergeConfig;
use regex::Regex;
use std::sync::LazyLock;
use tenderfold_domain::{ExtractedRecord, FieldPath, Value};
use tracing::warn;

/// A field was reset because two amounts matched
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyWarning {
    /// Field that was compared and kept
    pub deposit_path: FieldPath,
    /// Field that was reset
    pub contract_value_path: FieldPath,
    /// The shared amount
    pub amount: f64,
    /// Text the reset field held before
    pub previous: String,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' equals '{}' ({}); '{}' reset",
            self.contract_value_path, self.deposit_path, self.previous, self.contract_value_path
        )
    }
}

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// Parse a monetary amount such as `"₹50,000"` or `"Rs. 1,20,000.50"`
///
/// Thousands separators and currency markers are removed, then the first
/// number (digits with an optional decimal part) is parsed. Numbers are taken as they are.
///
/// # Examples
///
/// ```
/// use tenderfold_merge::parse_amount;
/// use tenderfold_domain::Value;
///
/// assert_eq!(parse_amount(&Value::string("₹10,00,000")), Some(1_000_000.0));
/// assert_eq!(parse_amount(&Value::string("Rs. 500 only")), Some(500.0));
/// assert_eq!(parse_amount(&Value::string("as per annexure")), None);
/// ```
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(text) => {
            let cleaned = text
                .replace(',', "")
                .replace('₹', "")
                .replace("INR", "")
                .replace("Rs.", "")
                .replace("Rs", "");
            let found = AMOUNT.find(&cleaned)?;
            found.as_str().parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Compare the deposit and contract value fields of a record
///
/// When both parse and differ by less than the configured epsilon, the
/// contract value is replaced with the sentinel and a warning is returned.
pub fn check_consistency(
    record: &mut ExtractedRecord,
    config: &MergeConfig,
) -> Option<ConsistencyWarning> {
    let check = &config.consistency;
    if !check.enabled {
        return None;
    }

    let deposit = record.get_path(&check.deposit_path).and_then(parse_amount)?;
    let contract_value = record.get_path(&check.contract_value_path)?;
    if let Value::String(text) = contract_value {
        if config.is_placeholder(text) {
            return None;
        }
    }
    let previous = contract_value.to_display_string();
    let amount = parse_amount(contract_value)?;

    if (deposit - amount).abs() >= check.epsilon {
        return None;
    }

    record.set_path(
        &check.contract_value_path,
        Value::string(config.sentinel.clone()),
    );
    let warning = ConsistencyWarning {
        deposit_path: check.deposit_path.clone(),
        contract_value_path: check.contract_value_path.clone(),
        amount,
        previous,
    };
    warn!("ConsistencyWarning: {}", warning);
    Some(warning)
}
