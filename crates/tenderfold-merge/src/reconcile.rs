//! Product list reconciliation
//!
//! Greedy single pass: every entry is compared with the entries kept so far
//! and merged into the first one it matches. The result depends on input
//! order; shuffling the input can produce a different (equally valid) list.

use crate::config::MergeConfig;
use crate::similarity::similarity;
use tenderfold_domain::{FieldPath, ProductEntry, Value};
use tracing::debug;

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Entries received
    pub initial: usize,
    /// Entries returned
    pub final_count: usize,
    /// Entries merged into an earlier entry
    pub duplicates_removed: usize,
    /// Entries dropped for having no usable name
    pub dropped: usize,
    /// Entries cut by the size cap
    pub truncated: usize,
}

impl ReconcileStats {
    /// Add another pass's numbers to this one
    pub fn absorb(&mut self, other: ReconcileStats) {
        self.initial += other.initial;
        self.final_count += other.final_count;
        self.duplicates_removed += other.duplicates_removed;
        self.dropped += other.dropped;
        self.truncated += other.truncated;
    }
}

/// Fuzzy identity resolution over product entries
#[derive(Debug, Clone)]
pub struct ProductReconciler {
    config: MergeConfig,
}

impl ProductReconciler {
    /// Create a reconciler
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge duplicate entries, order known-OEM entries first and apply the cap
    pub fn reconcile(&self, entries: Vec<ProductEntry>) -> Vec<ProductEntry> {
        self.reconcile_with_stats(entries).0
    }

    /// As [`reconcile`](Self::reconcile), also returning what happened
    pub fn reconcile_with_stats(
        &self,
        entries: Vec<ProductEntry>,
    ) -> (Vec<ProductEntry>, ReconcileStats) {
        let mut stats = ReconcileStats {
            initial: entries.len(),
            ..ReconcileStats::default()
        };

        let mut kept: Vec<ProductEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() || self.config.is_placeholder(name) {
                stats.dropped += 1;
                continue;
            }

            match kept.iter_mut().find(|existing| self.is_same_product(existing, &entry)) {
                Some(existing) => {
                    debug!("Merging product '{}' into '{}'", entry.name, existing.name);
                    self.merge_entry(existing, entry);
                    stats.duplicates_removed += 1;
                }
                None => kept.push(entry),
            }
        }

        let (mut ordered, unknown): (Vec<_>, Vec<_>) = kept
            .into_iter()
            .partition(|entry| !self.config.is_unspecified_oem(&entry.oem));
        ordered.extend(unknown);

        let cap = self.config.reconcile.max_entries;
        if ordered.len() > cap {
            stats.truncated = ordered.len() - cap;
            ordered.truncate(cap);
        }

        stats.final_count = ordered.len();
        (ordered, stats)
    }

    /// Reconcile the items of a product-list array
    ///
    /// Map items are read as entries; bare strings become entries with just a
    /// name. Other items are dropped.
    pub fn reconcile_values(&self, items: &[Value]) -> (Vec<Value>, ReconcileStats) {
        let entries: Vec<ProductEntry> = items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(ProductEntry::new(name.clone())),
                other => ProductEntry::from_value(other),
            })
            .collect();
        let skipped = items.len() - entries.len();

        let (entries, mut stats) = self.reconcile_with_stats(entries);
        stats.initial += skipped;
        stats.dropped += skipped;
        (entries.iter().map(ProductEntry::to_value).collect(), stats)
    }

    /// The identity rule
    ///
    /// Same normalized name, or similar names whose OEMs do not contradict
    /// each other. A very close name match overrides differing OEMs.
    pub fn is_same_product(&self, a: &ProductEntry, b: &ProductEntry) -> bool {
        let name_a = a.normalized_name();
        let name_b = b.normalized_name();
        if name_a == name_b {
            return true;
        }

        let thresholds = &self.config.reconcile;
        let name_sim = similarity(&name_a, &name_b);
        if name_sim < thresholds.name_threshold {
            return false;
        }

        if self.config.is_unspecified_oem(&a.oem) || self.config.is_unspecified_oem(&b.oem) {
            return true;
        }

        let oem_sim = similarity(&a.oem.trim().to_lowercase(), &b.oem.trim().to_lowercase());
        oem_sim >= thresholds.oem_threshold || name_sim >= thresholds.strong_name_threshold
    }

    /// Fold `other` into `base`; `base` keeps its name and position
    fn merge_entry(&self, base: &mut ProductEntry, other: ProductEntry) {
        if self.config.is_unspecified_oem(&base.oem) && !self.config.is_unspecified_oem(&other.oem)
        {
            base.oem = other.oem;
        }
        base.specifications = merge_specifications(&base.specifications, &other.specifications);
        if other.confidence > base.confidence {
            base.confidence = other.confidence;
        }
    }
}

/// Union two specification lists
///
/// Parts are split on `;`, `,` and newlines, compared case-insensitively and
/// rejoined with `"; "`. When `other` adds nothing the base text is returned
/// untouched.
pub fn merge_specifications(base: &str, other: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut parts: Vec<&str> = Vec::new();
    for part in split_specs(base) {
        let key = part.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            parts.push(part);
        }
    }

    let mut added = false;
    for part in split_specs(other) {
        let key = part.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            parts.push(part);
            added = true;
        }
    }

    if added {
        parts.join("; ")
    } else {
        base.to_string()
    }
}

fn split_specs(text: &str) -> impl Iterator<Item = &str> {
    text.split([';', ',', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// Refresh `totalItems` and `productsMapped` next to the product list
///
/// Does nothing when the record has no product list at the configured path.
pub fn refresh_product_stats(
    record: &mut tenderfold_domain::ExtractedRecord,
    config: &MergeConfig,
) {
    let list_path = &config.product_list_path;
    let Some(items) = record.get_path(list_path).and_then(Value::as_array) else {
        return;
    };

    let total = items.len();
    let mapped = items
        .iter()
        .filter_map(ProductEntry::from_value)
        .filter(|entry| !config.is_unspecified_oem(&entry.oem))
        .count();

    let parent = list_path.parent().unwrap_or_else(FieldPath::root);
    record.set_path(&parent.child("totalItems"), Value::Number(total as f64));
    record.set_path(&parent.child("productsMapped"), Value::Number(mapped as f64));
}
