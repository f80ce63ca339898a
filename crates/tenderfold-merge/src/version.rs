//! Folding document versions onto a project baseline

use crate::config::MergeConfig;
use crate::consistency::{check_consistency, ConsistencyWarning};
use crate::error::ValidationError;
use crate::provenance::ProvenanceLedger;
use crate::reconcile::refresh_product_stats;
use crate::structural::{ChunkMerger, MergeReport, MergeTypeConflict};
use tenderfold_domain::{DocumentVersion, ExtractedRecord, ProvenanceRecord, VersionKind};
use tracing::{debug, info};

/// Result of applying one version
#[derive(Debug, Clone, PartialEq)]
pub struct VersionOutcome {
    /// The project's new baseline
    pub baseline: ExtractedRecord,
    /// Facts contributed by the version, to append to the ledger
    pub provenance: Vec<ProvenanceRecord>,
    /// Type conflicts met while folding
    pub conflicts: Vec<MergeTypeConflict>,
    /// Consistency resets applied to the baseline
    pub warnings: Vec<ConsistencyWarning>,
}

/// Folds new document versions onto the running project baseline
///
/// | baseline | kind               | result                          |
/// |----------|--------------------|---------------------------------|
/// | absent   | base               | becomes the initial baseline    |
/// | absent   | amendment/update   | [`ValidationError::MissingBase`]  |
/// | present  | base               | [`ValidationError::DuplicateBase`] |
/// | present  | amendment/update   | folded with [`ChunkMerger`]     |
///
/// The caller is responsible for running apply and write for one project
/// inside a single critical section.
#[derive(Debug, Clone)]
pub struct VersionMerger {
    merger: ChunkMerger,
    ledger: ProvenanceLedger,
}

impl VersionMerger {
    /// Create a version merger
    pub fn new(config: MergeConfig) -> Self {
        Self {
            merger: ChunkMerger::new(config.clone()),
            ledger: ProvenanceLedger::new(config),
        }
    }

    /// The structural merger used for folding
    pub fn chunk_merger(&self) -> &ChunkMerger {
        &self.merger
    }

    /// The ledger used to explode versions into facts
    pub fn ledger(&self) -> &ProvenanceLedger {
        &self.ledger
    }

    /// Check that a version of `kind` may follow the project's current state
    pub fn validate_sequence(has_baseline: bool, kind: VersionKind) -> Result<(), ValidationError> {
        match (has_baseline, kind.is_base()) {
            (false, true) | (true, false) => Ok(()),
            (false, false) => Err(ValidationError::MissingBase),
            (true, true) => Err(ValidationError::DuplicateBase),
        }
    }

    /// Fold `version` onto `baseline`
    pub fn apply_version(
        &self,
        baseline: Option<&ExtractedRecord>,
        version: &DocumentVersion,
    ) -> Result<VersionOutcome, ValidationError> {
        Self::validate_sequence(baseline.is_some(), version.kind)?;

        let mut report = MergeReport::default();
        let mut next = match baseline {
            None => self.merger.seed(&version.record, &mut report),
            Some(current) => {
                let mut next = current.clone();
                self.merger.merge_into(&mut next, &version.record, &mut report);
                next
            }
        };

        let config = self.merger.config();
        refresh_product_stats(&mut next, config);
        let warnings: Vec<ConsistencyWarning> =
            check_consistency(&mut next, config).into_iter().collect();

        let provenance = self.ledger.explode(&version.record, version);
        info!(
            "Applied {} version {} to project '{}' ({} facts, {} conflicts)",
            version.kind,
            version.id,
            version.project_id,
            provenance.len(),
            report.conflicts.len()
        );

        Ok(VersionOutcome {
            baseline: next,
            provenance,
            conflicts: report.conflicts,
            warnings,
        })
    }

    /// Recompute a baseline from stored versions, in creation order
    ///
    /// Returns `None` for an empty history. All versions must belong to the
    /// same project.
    pub fn fold_versions(
        &self,
        versions: &[DocumentVersion],
    ) -> Result<Option<ExtractedRecord>, ValidationError> {
        let mut ordered: Vec<&DocumentVersion> = versions.iter().collect();
        ordered.sort_by_key(|version| (version.created_at, version.id));

        let mut baseline: Option<ExtractedRecord> = None;
        for version in &ordered {
            let expected = &ordered[0].project_id;
            if version.project_id != *expected {
                return Err(ValidationError::ProjectMismatch {
                    expected: expected.to_string(),
                    found: version.project_id.to_string(),
                });
            }
            let outcome = self.apply_version(baseline.as_ref(), version)?;
            baseline = Some(outcome.baseline);
        }

        debug!("Folded {} versions", versions.len());
        Ok(baseline)
    }
}

impl Default for VersionMerger {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderfold_domain::{FieldPath, ProductEntry, ProjectId, Value};

    fn record(json: &str) -> ExtractedRecord {
        ExtractedRecord::from_json_str(json).unwrap()
    }

    fn version(kind: VersionKind, created_at: u64, json: &str) -> DocumentVersion {
        DocumentVersion::new(
            ProjectId::new("metro-hvac"),
            kind,
            format!("hash-{}", created_at),
            format!("doc-{}.pdf", created_at),
            created_at,
            record(json),
        )
    }

    fn flat_merger() -> VersionMerger {
        let mut config = MergeConfig::default();
        config.consistency.deposit_path = FieldPath::parse("emd").unwrap();
        config.consistency.contract_value_path = FieldPath::parse("bidValue").unwrap();
        VersionMerger::new(config)
    }

    #[test]
    fn test_sequence_rules() {
        assert!(VersionMerger::validate_sequence(false, VersionKind::Base).is_ok());
        assert!(VersionMerger::validate_sequence(true, VersionKind::Amendment).is_ok());
        assert!(VersionMerger::validate_sequence(true, VersionKind::ReferenceUpdate).is_ok());
        assert_eq!(
            VersionMerger::validate_sequence(false, VersionKind::Amendment),
            Err(ValidationError::MissingBase)
        );
        assert_eq!(
            VersionMerger::validate_sequence(true, VersionKind::Base),
            Err(ValidationError::DuplicateBase)
        );
    }

    #[test]
    fn test_rejects_non_base_first_version() {
        let merger = VersionMerger::default();
        let amendment = version(VersionKind::Amendment, 1, r#"{"a": "b"}"#);

        let err = merger.apply_version(None, &amendment).unwrap_err();
        assert_eq!(err.to_string(), "project must start with a base version");
    }

    #[test]
    fn test_rejects_second_base() {
        let merger = VersionMerger::default();
        let base = version(VersionKind::Base, 1, r#"{"a": "b"}"#);
        let baseline = merger.apply_version(None, &base).unwrap().baseline;

        let second = version(VersionKind::Base, 2, r#"{"a": "c"}"#);
        let err = merger.apply_version(Some(&baseline), &second).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateBase);
        assert_eq!(err.to_string(), "base version already exists");
    }

    #[test]
    fn test_empty_amendment_value_keeps_baseline() {
        let merger = flat_merger();
        let base = version(VersionKind::Base, 1, r#"{"bidValue": "₹10,00,000"}"#);
        let baseline = merger.apply_version(None, &base).unwrap().baseline;

        let amendment = version(VersionKind::Amendment, 2, r#"{"bidValue": ""}"#);
        let outcome = merger.apply_version(Some(&baseline), &amendment).unwrap();

        assert_eq!(
            outcome.baseline.get("bidValue"),
            Some(&Value::string("₹10,00,000"))
        );
        assert!(outcome.provenance.is_empty());
    }

    #[test]
    fn test_equal_deposit_and_bid_value_resets_bid_value() {
        let merger = flat_merger();
        let base = version(
            VersionKind::Base,
            1,
            r#"{"emd": "₹50,000", "bidValue": "₹50,000"}"#,
        );
        let outcome = merger.apply_version(None, &base).unwrap();

        assert_eq!(outcome.baseline.get("bidValue"), Some(&Value::string("unknown")));
        assert_eq!(outcome.baseline.get("emd"), Some(&Value::string("₹50,000")));
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_amendment_reconciles_products() {
        let merger = VersionMerger::default();
        let base = version(
            VersionKind::Base,
            1,
            r#"{"productMapping": {"miiProductStatus": [
                {"productName": "Split AC", "oem": "Unspecified"}]}}"#,
        );
        let baseline = merger.apply_version(None, &base).unwrap().baseline;

        let update = version(
            VersionKind::ReferenceUpdate,
            2,
            r#"{"productMapping": {"miiProductStatus": [
                {"productName": "Split A/C", "oem": "Daikin"}]}}"#,
        );
        let outcome = merger.apply_version(Some(&baseline), &update).unwrap();

        let list = FieldPath::parse("productMapping.miiProductStatus").unwrap();
        let items = outcome.baseline.get_path(&list).unwrap().as_array().unwrap();
        assert_eq!(items.len(), 1);
        let entry = ProductEntry::from_value(&items[0]).unwrap();
        assert_eq!((entry.name.as_str(), entry.oem.as_str()), ("Split AC", "Daikin"));

        let mapping = outcome.baseline.get("productMapping").unwrap().as_map().unwrap();
        assert_eq!(mapping["totalItems"], Value::Number(1.0));
        assert_eq!(mapping["productsMapped"], Value::Number(1.0));
    }

    #[test]
    fn test_base_version_products_are_reconciled() {
        let merger = VersionMerger::default();
        let base = version(
            VersionKind::Base,
            1,
            r#"{"productMapping": {"miiProductStatus": [
                {"productName": "Chiller", "oem": "Unspecified"},
                {"productName": "chiller", "oem": "Voltas"}]}}"#,
        );
        let outcome = merger.apply_version(None, &base).unwrap();

        let list = FieldPath::parse("productMapping.miiProductStatus").unwrap();
        let items = outcome.baseline.get_path(&list).unwrap().as_array().unwrap();
        assert_eq!(items.len(), 1);
        let entry = ProductEntry::from_value(&items[0]).unwrap();
        assert_eq!((entry.name.as_str(), entry.oem.as_str()), ("Chiller", "Voltas"));

        let mapping = outcome.baseline.get("productMapping").unwrap().as_map().unwrap();
        assert_eq!(mapping["totalItems"], Value::Number(1.0));
        assert_eq!(merger.fold_versions(&[base]).unwrap(), Some(outcome.baseline));
    }

    #[test]
    fn test_amendment_changes_only_its_field() {
        let merger = VersionMerger::default();
        let base = version(
            VersionKind::Base,
            1_000,
            r#"{"projectOverview": {"tenderId": "T-17", "lastSubmissionDate": "2024-05-01"},
                "legal": {"jurisdiction": "Delhi"}}"#,
        );
        let base_outcome = merger.apply_version(None, &base).unwrap();

        let amendment = version(
            VersionKind::Amendment,
            2_000,
            r#"{"projectOverview": {"lastSubmissionDate": "2024-05-15"}}"#,
        );
        let outcome = merger
            .apply_version(Some(&base_outcome.baseline), &amendment)
            .unwrap();

        assert_eq!(
            outcome.baseline,
            record(
                r#"{"projectOverview": {"tenderId": "T-17", "lastSubmissionDate": "2024-05-15"},
                    "legal": {"jurisdiction": "Delhi"}}"#
            )
        );

        let path = FieldPath::parse("projectOverview.lastSubmissionDate").unwrap();
        let new_facts: Vec<_> = outcome
            .provenance
            .iter()
            .filter(|f| f.section_path == path)
            .collect();
        assert_eq!(new_facts.len(), 1);
        assert_eq!(outcome.provenance.len(), 1);
        assert_eq!(new_facts[0].content, "2024-05-15");
        assert_eq!(new_facts[0].source_kind, VersionKind::Amendment);
        assert!(base_outcome
            .provenance
            .iter()
            .all(|f| f.created_at < new_facts[0].created_at));
    }

    #[test]
    fn test_fold_versions_matches_incremental_application() {
        let merger = VersionMerger::default();
        let versions = vec![
            version(VersionKind::Base, 1, r#"{"a": {"x": "1"}, "list": ["p"]}"#),
            version(VersionKind::Amendment, 2, r#"{"a": {"y": "2"}, "list": ["q"]}"#),
            version(VersionKind::ReferenceUpdate, 3, r#"{"a": {"x": "3"}}"#),
        ];

        let mut incremental: Option<ExtractedRecord> = None;
        for v in &versions {
            incremental = Some(merger.apply_version(incremental.as_ref(), v).unwrap().baseline);
        }

        // stored order does not matter, creation order does
        let mut shuffled = versions.clone();
        shuffled.reverse();
        assert_eq!(merger.fold_versions(&shuffled).unwrap(), incremental);
        assert_eq!(
            incremental.unwrap(),
            record(r#"{"a": {"x": "3", "y": "2"}, "list": ["p", "q"]}"#)
        );
    }

    #[test]
    fn test_fold_versions_empty_and_invalid() {
        let merger = VersionMerger::default();
        assert_eq!(merger.fold_versions(&[]).unwrap(), None);

        let versions = vec![version(VersionKind::Amendment, 1, r#"{"a": "b"}"#)];
        assert_eq!(
            merger.fold_versions(&versions),
            Err(ValidationError::MissingBase)
        );
    }
}
