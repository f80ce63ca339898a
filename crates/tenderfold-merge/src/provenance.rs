//! Atomic fact ledger

use crate::config::MergeConfig;
use tenderfold_domain::{DocumentVersion, ExtractedRecord, FieldPath, ProvenanceRecord, Value};

/// Explodes records into provenance entries
///
/// Every informative leaf scalar becomes one entry at its dotted path, and
/// every array item becomes one entry at the array's path. Composite array
/// items (such as product entries) are rendered as compact JSON.
#[derive(Debug, Clone)]
pub struct ProvenanceLedger {
    config: MergeConfig,
}

impl ProvenanceLedger {
    /// Create a ledger
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// One record per atomic fact in `record`, tagged with `version`
    pub fn explode(
        &self,
        record: &ExtractedRecord,
        version: &DocumentVersion,
    ) -> Vec<ProvenanceRecord> {
        let mut facts = Vec::new();
        for (key, value) in record.as_map() {
            self.walk(value, &FieldPath::root().child(key), &mut facts);
        }

        facts
            .into_iter()
            .map(|(path, content)| {
                ProvenanceRecord::new(
                    version.project_id.clone(),
                    version.id,
                    path,
                    content,
                    version.kind,
                    version.source_file.clone(),
                    version.created_at,
                )
            })
            .collect()
    }

    fn walk(&self, value: &Value, path: &FieldPath, facts: &mut Vec<(FieldPath, String)>) {
        match value {
            Value::Map(fields) => {
                for (key, child) in fields {
                    self.walk(child, &path.child(key), facts);
                }
            }
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Array(_) | Value::Map(_) => {
                            facts.push((path.clone(), item.to_string()));
                        }
                        scalar if self.config.is_informative(scalar) => {
                            facts.push((path.clone(), scalar.to_display_string()));
                        }
                        _ => {}
                    }
                }
            }
            scalar => {
                if self.config.is_informative(scalar) {
                    facts.push((path.clone(), scalar.to_display_string()));
                }
            }
        }
    }

    /// Facts at `path` or below it, ordered by creation time
    ///
    /// The sort is stable, so facts from one version keep their walk order.
    pub fn filter_section(
        records: &[ProvenanceRecord],
        path: &FieldPath,
    ) -> Vec<ProvenanceRecord> {
        let mut matching: Vec<ProvenanceRecord> = records
            .iter()
            .filter(|record| record.section_path.segments().starts_with(path.segments()))
            .cloned()
            .collect();
        matching.sort_by_key(|record| record.created_at);
        matching
    }
}

impl Default for ProvenanceLedger {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}
