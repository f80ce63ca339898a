//! Pattern-based line-item extraction
//!
//! Used when the model returned no products at all. The document text is
//! scanned for bill-of-quantities sections and their table rows are read as
//! product entries.

use regex::Regex;
use std::sync::LazyLock;
use tenderfold_domain::product::keys;
use tenderfold_domain::{LineItemSource, ProductEntry, Value};
use tracing::{debug, info, warn};

/// Phrases that introduce a product table
const SECTION_KEYWORDS: [&str; 12] = [
    "bill of quantities",
    "boq",
    "bom",
    "bill of materials",
    "schedule of items",
    "item description",
    "annexure",
    "annexe",
    "schedule",
    "technical specifications",
    "product list",
    "items to be supplied",
];

/// Names containing these are column headers, not products
const HEADER_WORDS: [&str; 7] = [
    "sr.no",
    "sl.no",
    "item",
    "description",
    "product",
    "quantity",
    "total",
];

const UNITS: [&str; 10] = [
    "nos", "no", "pcs", "units", "set", "sets", "meter", "meters", "kg", "liter",
];

/// Source tag of entries produced here
pub const FALLBACK_SOURCE: &str = "fallback-extraction";

static WIDE_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{3,}").expect("valid regex"));
static CELL_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid regex"));
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+\w").expect("valid regex"));
static SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.|)]?\s*").expect("valid regex"));
static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

/// Reads product tables out of plain document text
#[derive(Debug, Clone)]
pub struct PatternLineItemSource {
    max_sections: usize,
    section_window: usize,
    max_rows: usize,
}

impl PatternLineItemSource {
    /// Create a source with the default limits: 3 sections, 300 lines each, 100 rows
    pub fn new() -> Self {
        Self {
            max_sections: 3,
            section_window: 300,
            max_rows: 100,
        }
    }

    /// Parse at most `max_rows` candidate rows
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Collect lines that look like table rows or numbered items
    fn candidate_rows<'a>(&self, lines: &[&'a str]) -> Vec<&'a str> {
        let mut starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| {
                let lower = line.to_lowercase();
                SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
            })
            .map(|(i, _)| i)
            .collect();

        if starts.is_empty() {
            debug!("No product table header found, scanning whole document");
            starts.push(0);
        }

        // Overlapping windows are scanned once, in document order
        let mut in_window = vec![false; lines.len()];
        for &start in starts.iter().take(self.max_sections) {
            let end = (start + self.section_window).min(lines.len());
            in_window[start..end].iter_mut().for_each(|flag| *flag = true);
        }
        let mut rows: Vec<&str> = lines
            .iter()
            .zip(&in_window)
            .filter(|(line, scan)| **scan && is_table_row(line))
            .map(|(line, _)| *line)
            .collect();

        if rows.is_empty() {
            debug!("No table rows found, looking for numbered items");
            rows = lines
                .iter()
                .copied()
                .filter(|line| NUMBERED_ITEM.is_match(line))
                .collect();
        }
        rows
    }
}

impl Default for PatternLineItemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineItemSource for PatternLineItemSource {
    fn line_items(&self, text: &str) -> Vec<ProductEntry> {
        let lines: Vec<&str> = text.split('\n').collect();
        let rows = self.candidate_rows(&lines);
        if rows.is_empty() {
            warn!("Fallback found no table rows or numbered items");
            return Vec::new();
        }

        let mut products = Vec::new();
        for row in rows.into_iter().take(self.max_rows) {
            if let Some(entry) = parse_row(row, products.len() + 1) {
                products.push(entry);
            }
        }
        info!("Fallback extracted {} products", products.len());
        products
    }
}

fn is_table_row(line: &str) -> bool {
    let delimited = line.contains('|') || line.contains('\t') || WIDE_GAP.is_match(line);
    let trimmed = line.trim();
    delimited
        && !trimmed.is_empty()
        && !trimmed.chars().all(|c| matches!(c, '-' | '=' | '|' | '+' | '\t' | ' '))
}

fn split_cells(row: &str) -> Vec<&str> {
    let cells: Vec<&str> = if row.contains('|') {
        row.split('|').collect()
    } else if row.contains('\t') {
        row.split('\t').collect()
    } else {
        CELL_GAP.split(row).collect()
    };
    cells
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Read one row; `position` numbers rows that carry no serial of their own
fn parse_row(row: &str, position: usize) -> Option<ProductEntry> {
    let cells = split_cells(row.trim());
    if cells.len() < 2 {
        return None;
    }

    let (serial, name) = match SERIAL.captures(cells[0]) {
        Some(caps) => (caps[1].to_string(), cells[1]),
        None => (position.to_string(), cells[0]),
    };

    let lower = name.to_lowercase();
    if HEADER_WORDS.iter().any(|w| lower.contains(w)) {
        return None;
    }
    if name.chars().count() < 3 || name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut quantity = "N/A";
    let mut unit = "N/A";
    for cell in &cells[1..] {
        if QUANTITY.is_match(cell) {
            quantity = cell;
        } else if UNITS.contains(&cell.to_lowercase().as_str()) {
            unit = cell;
        }
    }

    let specifications = if cells.len() > 2 {
        cells[2..cells.len().min(5)].join(" | ")
    } else {
        String::new()
    };

    let mut entry = ProductEntry::new(name.chars().take(100).collect::<String>())
        .with_category("Other")
        .with_specifications(specifications)
        .with_quantity(quantity, unit)
        .with_oem("Unspecified")
        .with_source(FALLBACK_SOURCE)
        .with_extra("srNo", Value::string(serial))
        .with_extra(keys::STATUS_ALT, Value::string("Pending Classification"));
    entry.model = "N/A".to_string();
    entry.status = "Pending Classification".to_string();
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOQ: &str = "\
Section 5: Bill of Quantities
Sr.No | Item Description | Specification | Qty | Unit
------+------------------+---------------+-----+-----
1 | Split AC 1.5 Ton | Inverter, 5 star | 12 | Nos
2 | Acoustic Panels | 25mm, fire rated | 300 | sets
3 | 42 | x | 1 | nos
";

    #[test]
    fn test_reads_delimited_boq_rows() {
        let products = PatternLineItemSource::new().line_items(BOQ);

        assert_eq!(products.len(), 2);
        let ac = &products[0];
        assert_eq!(ac.name, "Split AC 1.5 Ton");
        assert_eq!(ac.quantity, "12");
        assert_eq!(ac.unit, "Nos");
        assert_eq!(ac.specifications, "Inverter, 5 star | 12 | Nos");
        assert_eq!(ac.oem, "Unspecified");
        assert_eq!(ac.source, FALLBACK_SOURCE);

        let value = ac.to_value();
        let map = value.as_map().unwrap();
        assert_eq!(map["srNo"], Value::string("1"));
        assert_eq!(map["miiStatus"], Value::string("Pending Classification"));
        assert_eq!(map["model"], Value::string("N/A"));
    }

    #[test]
    fn test_whitespace_columns() {
        let text = "Schedule of items\nLED Luminaire     40W     25     nos\n";
        let products = PatternLineItemSource::new().line_items(text);

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "LED Luminaire");
        assert_eq!(products[0].quantity, "25");
        assert_eq!(products[0].unit, "nos");
        assert_eq!(products[0].to_value().as_map().unwrap()["srNo"], Value::string("1"));
    }

    #[test]
    fn test_numbered_items_without_tables() {
        let text = "Scope\n1.  Network switch  24 port\n2)  Fibre patch cord  2m\nTerms apply.";
        let products = PatternLineItemSource::new().line_items(text);

        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Network switch", "Fibre patch cord"]);
        assert_eq!(products[1].to_value().as_map().unwrap()["srNo"], Value::string("2"));
    }

    #[test]
    fn test_no_tables_no_products() {
        let text = "The bidder shall submit the EMD before the deadline.";
        assert!(PatternLineItemSource::new().line_items(text).is_empty());
    }

    #[test]
    fn test_row_limit() {
        let mut text = String::from("BOQ\n");
        for i in 1..=20 {
            text.push_str(&format!("{} | Cable tray type {} | 10 | meter\n", i, i));
        }
        let products = PatternLineItemSource::new().with_max_rows(5).line_items(&text);
        assert_eq!(products.len(), 5);
    }
}
