//! Recursive structural merge of extracted records

use crate::config::MergeConfig;
use crate::reconcile::{ProductReconciler, ReconcileStats};
use tenderfold_domain::{ExtractedRecord, FieldPath, Value, ValueKind};
use tracing::{debug, warn};

/// Two records disagreed on the type of a field
///
/// Never fatal: the more structured value is kept and the conflict is logged
/// and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTypeConflict {
    /// Where the conflict happened
    pub path: FieldPath,
    /// Type already in the accumulator
    pub existing: ValueKind,
    /// Type of the incoming value
    pub incoming: ValueKind,
    /// Type that was kept
    pub kept: ValueKind,
}

/// What a merge did besides producing the record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Type conflicts encountered, in merge order
    pub conflicts: Vec<MergeTypeConflict>,
    /// Accumulated product reconciliation numbers
    pub reconcile: ReconcileStats,
}

/// Folds an ordered sequence of partial records into one
///
/// The first record seeds the accumulator, with its product list reconciled,
/// and every later record is folded into it:
///
/// - maps recurse key by key; keys missing from the accumulator are inserted
/// - arrays become an ordered set union, except the configured product list,
///   which goes through [`ProductReconciler`]
/// - scalars are overwritten only by informative scalars (not null, blank, or
///   a placeholder)
/// - on a type mismatch maps beat arrays and arrays beat scalars
///
/// Because the fold is left-to-right, `merge([r1, r2, r3])` equals
/// `merge([merge([r1, r2]), r3])`.
#[derive(Debug, Clone)]
pub struct ChunkMerger {
    config: MergeConfig,
    reconciler: ProductReconciler,
}

impl ChunkMerger {
    /// Create a merger
    pub fn new(config: MergeConfig) -> Self {
        let reconciler = ProductReconciler::new(config.clone());
        Self { config, reconciler }
    }

    /// The merge configuration in use
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// The product reconciler in use
    pub fn reconciler(&self) -> &ProductReconciler {
        &self.reconciler
    }

    /// Merge records in order; an empty slice yields an empty record
    pub fn merge(&self, records: &[ExtractedRecord]) -> ExtractedRecord {
        self.merge_with_report(records).0
    }

    /// Merge records in order, returning what happened along the way
    pub fn merge_with_report(&self, records: &[ExtractedRecord]) -> (ExtractedRecord, MergeReport) {
        let mut report = MergeReport::default();
        let Some((first, rest)) = records.split_first() else {
            return (ExtractedRecord::new(), report);
        };

        let mut accumulator = self.seed(first, &mut report);
        for record in rest {
            self.merge_into(&mut accumulator, record, &mut report);
        }

        debug!(
            "Merged {} records ({} type conflicts)",
            records.len(),
            report.conflicts.len()
        );
        (accumulator, report)
    }

    /// Copy a record to start an accumulator from
    ///
    /// The product list is reconciled even though nothing was merged into it
    /// yet, so a lone record already holds no duplicate products.
    pub fn seed(&self, record: &ExtractedRecord, report: &mut MergeReport) -> ExtractedRecord {
        let mut seeded = record.clone();
        if let Some((head, rest)) = self.config.product_list_path.segments().split_first() {
            if let Some(value) = seeded.as_map_mut().get_mut(head) {
                self.reconcile_list_at(value, rest, report);
            }
        }
        seeded
    }

    /// Fold one record into an accumulator
    pub fn merge_into(
        &self,
        accumulator: &mut ExtractedRecord,
        incoming: &ExtractedRecord,
        report: &mut MergeReport,
    ) {
        self.merge_fields(
            accumulator.as_map_mut(),
            incoming.as_map(),
            &FieldPath::root(),
            report,
        );
    }

    fn merge_fields(
        &self,
        accumulator: &mut std::collections::BTreeMap<String, Value>,
        incoming: &std::collections::BTreeMap<String, Value>,
        path: &FieldPath,
        report: &mut MergeReport,
    ) {
        for (key, value) in incoming {
            let child = path.child(key);
            match accumulator.get_mut(key) {
                Some(existing) => self.merge_value(existing, value, &child, report),
                None => {
                    accumulator.insert(key.clone(), self.adopt(value, &child, report));
                }
            }
        }
    }

    fn merge_value(
        &self,
        existing: &mut Value,
        incoming: &Value,
        path: &FieldPath,
        report: &mut MergeReport,
    ) {
        let existing_kind = existing.kind();
        let incoming_kind = incoming.kind();

        match (existing, incoming) {
            // Null carries no information
            (_, Value::Null) => {}

            (Value::Map(current), Value::Map(other)) => {
                self.merge_fields(current, other, path, report);
            }

            (Value::Array(current), Value::Array(other)) => {
                if *path == self.config.product_list_path {
                    let mut combined = std::mem::take(current);
                    combined.extend(other.iter().cloned());
                    let (items, stats) = self.reconciler.reconcile_values(&combined);
                    report.reconcile.absorb(stats);
                    *current = items;
                } else {
                    union_into(current, other);
                }
            }

            (slot, _) if existing_kind == ValueKind::Null && !incoming.is_scalar() => {
                *slot = self.adopt(incoming, path, report);
            }

            (slot, _) if existing_kind.structure_rank() == 0 && incoming.is_scalar() => {
                if self.config.is_informative(incoming) {
                    *slot = incoming.clone();
                }
            }

            (slot, _) => {
                let incoming_wins =
                    incoming_kind.structure_rank() > existing_kind.structure_rank();
                let kept = if incoming_wins {
                    incoming_kind
                } else {
                    existing_kind
                };

                warn!(
                    "MergeTypeConflict at '{}': {} vs {}, keeping {}",
                    path, existing_kind, incoming_kind, kept
                );
                report.conflicts.push(MergeTypeConflict {
                    path: path.clone(),
                    existing: existing_kind,
                    incoming: incoming_kind,
                    kept,
                });

                if incoming_wins {
                    *slot = self.adopt(incoming, path, report);
                }
            }
        }
    }

    /// Copy a value that enters the accumulator whole
    ///
    /// A product list inside the copy is reconciled on the way in.
    fn adopt(&self, value: &Value, path: &FieldPath, report: &mut MergeReport) -> Value {
        let mut copy = value.clone();
        let list_path = self.config.product_list_path.segments();
        if let Some(rest) = list_path.strip_prefix(path.segments()) {
            self.reconcile_list_at(&mut copy, rest, report);
        }
        copy
    }

    fn reconcile_list_at(&self, value: &mut Value, rest: &[String], report: &mut MergeReport) {
        if let Some(items) = list_at_mut(value, rest) {
            let (reconciled, stats) = self.reconciler.reconcile_values(items);
            report.reconcile.absorb(stats);
            *items = reconciled;
        }
    }
}

impl Default for ChunkMerger {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}

/// The array at `path` below `value`, if there is one
fn list_at_mut<'a>(mut value: &'a mut Value, path: &[String]) -> Option<&'a mut Vec<Value>> {
    for segment in path {
        value = value.as_map_mut()?.get_mut(segment)?;
    }
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Append items of `other` not already present, in encounter order
fn union_into(current: &mut Vec<Value>, other: &[Value]) {
    for item in other {
        if !current.contains(item) {
            current.push(item.clone());
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            Just(Value::string("")),
            Just(Value::string("N/A")),
            any::<bool>().prop_map(Value::Bool),
            (-1000i32..1000).prop_map(|n| Value::Number(n as f64)),
            "[a-z₹0-9 ,]{1,8}".prop_map(Value::String),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-e]", inner, 0..4).prop_map(Value::Map),
            ]
        })
    }

    fn record() -> impl Strategy<Value = ExtractedRecord> {
        prop::collection::btree_map("[a-e]", value(), 0..5)
            .prop_map(|fields: BTreeMap<String, Value>| ExtractedRecord::from_map(fields))
    }

    fn product_record() -> impl Strategy<Value = ExtractedRecord> {
        let entry = (
            prop::sample::select(vec!["Chiller", "chiller ", "Split AC", "Split A/C", "UPS", "Pump"]),
            prop::sample::select(vec!["Unspecified", "", "Daikin", "Voltas"]),
        )
            .prop_map(|(name, oem)| {
                let mut map = BTreeMap::new();
                map.insert("productName".to_string(), Value::string(name));
                map.insert("oem".to_string(), Value::string(oem));
                Value::Map(map)
            });
        prop::collection::vec(entry, 0..8).prop_map(|items| {
            let mut record = ExtractedRecord::new();
            record.set_path(
                &FieldPath::parse("productMapping.miiProductStatus").unwrap(),
                Value::Array(items),
            );
            record
        })
    }

    proptest! {
        #[test]
        fn reconciled_product_list_is_a_merge_fixed_point(raw in product_record()) {
            let merger = ChunkMerger::default();
            let reconciled = merger.merge(std::slice::from_ref(&raw));
            prop_assert_eq!(merger.merge(std::slice::from_ref(&reconciled)), reconciled.clone());
            prop_assert_eq!(merger.merge(&[reconciled.clone(), reconciled.clone()]), reconciled);
        }

        #[test]
        fn merging_a_record_with_itself_is_identity(r in record()) {
            let merger = ChunkMerger::default();
            prop_assert_eq!(merger.merge(&[r.clone(), r.clone()]), r);
        }

        #[test]
        fn merge_is_incrementally_foldable(r1 in record(), r2 in record(), r3 in record()) {
            let merger = ChunkMerger::default();
            let all_at_once = merger.merge(&[r1.clone(), r2.clone(), r3.clone()]);
            let incremental = merger.merge(&[merger.merge(&[r1, r2]), r3]);
            prop_assert_eq!(all_at_once, incremental);
        }
    }
}
