//! Document ingestion pipeline
//!
//! ```text
//! text ─► hash ─► pre-validate ─► ExtractionClient ─► ChunkMerger ─► fallback
//!                                                                       │
//!            ┌──────────── per-project critical section ────────────────┘
//!            ▼
//!   re-validate ─► VersionMerger ─► ProjectStore::put_baseline (atomic)
//! ```
//!
//! Nothing is written unless every step succeeds.

use crate::client::{ChunkBatch, ExtractionClient};
use crate::config::ExtractorConfig;
use crate::error::IngestError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tenderfold_domain::{
    BaselineHead, DocumentVersion, ExtractedRecord, LineItemSource, ProjectId, ProjectStore,
    RecordExtractor, Value, VersionCommit, VersionId, VersionKind,
};
use tenderfold_merge::{
    refresh_product_stats, ConsistencyWarning, MergeConfig, MergeReport, MergeTypeConflict,
    ReconcileStats, ValidationError, VersionMerger,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Key set next to the product list when the fallback source filled it
pub const EXTRACTION_METHOD_KEY: &str = "extractionMethod";

/// A document to ingest
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Target project
    pub project_id: ProjectId,
    /// Role of the document in the project
    pub kind: VersionKind,
    /// File name, used for labels and provenance
    pub source_file: String,
    /// Full document text
    pub text: String,
}

/// Summary of a committed ingestion
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Id of the new version
    pub version_id: VersionId,
    /// Kind of the new version
    pub kind: VersionKind,
    /// SHA-256 of the document text
    pub content_hash: String,
    /// Creation time of the version (ms since epoch)
    pub created_at: u64,
    /// Project baseline after the commit
    pub baseline: ExtractedRecord,
    /// Chunks the document was split into
    pub chunks: usize,
    /// Chunks that degraded to the empty record
    pub degraded_chunks: usize,
    /// True when the product list came from the fallback source
    pub used_fallback: bool,
    /// Product list reconciliation counts for the document
    pub reconcile: ReconcileStats,
    /// Type conflicts resolved while merging chunks and folding the version
    pub conflicts: Vec<MergeTypeConflict>,
    /// Fields reset by the consistency check
    pub warnings: Vec<ConsistencyWarning>,
    /// Provenance records written
    pub provenance_count: usize,
}

/// Result of recomputing a baseline from the stored versions
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildReport {
    /// Versions folded
    pub versions: usize,
    /// Baseline recomputed from the versions
    pub rebuilt: Option<ExtractedRecord>,
    /// Baseline currently stored
    pub stored: Option<ExtractedRecord>,
}

impl RebuildReport {
    /// True when the stored baseline equals the fold of the versions
    pub fn is_consistent(&self) -> bool {
        self.rebuilt == self.stored
    }
}

/// Runs documents through extraction, merging and the version fold
///
/// One ingestor can serve many projects at once. Reading the baseline,
/// folding and committing are serialized per project; extraction is not.
pub struct Ingestor<E, S>
where
    E: RecordExtractor + 'static,
    S: ProjectStore,
{
    client: ExtractionClient<E>,
    store: Arc<S>,
    merger: VersionMerger,
    fallback: Option<Arc<dyn LineItemSource>>,
    locks: Mutex<HashMap<ProjectId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<E, S> Ingestor<E, S>
where
    E: RecordExtractor + 'static,
    S: ProjectStore,
    S::Error: Display,
{
    /// Create an ingestor
    pub fn new(
        extractor: E,
        store: Arc<S>,
        extractor_config: ExtractorConfig,
        merge_config: MergeConfig,
    ) -> Self {
        let client =
            ExtractionClient::new(extractor, extractor_config, &merge_config.product_list_path);
        Self {
            client,
            store,
            merger: VersionMerger::new(merge_config),
            fallback: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Consult `source` when a document's merged product list is empty
    pub fn with_fallback(mut self, source: impl LineItemSource + 'static) -> Self {
        self.fallback = Some(Arc::new(source));
        self
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The version merger
    pub fn merger(&self) -> &VersionMerger {
        &self.merger
    }

    /// Ingest one document
    ///
    /// # Errors
    ///
    /// - [`IngestError::Validation`] before any extraction call when the
    ///   version cannot follow the project's history or the text was already
    ///   ingested
    /// - [`IngestError::Extraction`] when the quota ran out
    /// - [`IngestError::Cancelled`] when `cancel` fired before the commit
    /// - [`IngestError::Store`] when persistence failed, including a commit
    ///   refused because another writer moved the project's head after this
    ///   ingestion read it
    ///
    /// The stored baseline is unchanged after any error.
    pub async fn ingest(
        &self,
        request: IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let content_hash = content_hash(&request.text);
        info!(
            "Ingesting {} '{}' into project '{}' ({} chars)",
            request.kind,
            request.source_file,
            request.project_id,
            request.text.chars().count()
        );

        self.check_admissible(&request.project_id, request.kind, &content_hash)?;

        let batch = self
            .client
            .extract_document(&request.text, &request.source_file, cancel)
            .await?;
        if batch.partial {
            return Err(cancelled(batch));
        }

        let (mut record, mut merge_report) =
            self.merger.chunk_merger().merge_with_report(&batch.records());
        let used_fallback = self.apply_fallback(&mut record, &request.text, &mut merge_report);
        refresh_product_stats(&mut record, self.merger.chunk_merger().config());

        let lock = self.project_lock(&request.project_id);
        let _guard = lock.lock().await;

        if cancel.is_cancelled() {
            return Err(cancelled(batch));
        }
        let head = self.check_admissible(&request.project_id, request.kind, &content_hash)?;
        let created_at = self.next_timestamp(&request.project_id)?;

        let version = DocumentVersion::new(
            request.project_id.clone(),
            request.kind,
            content_hash.clone(),
            request.source_file.clone(),
            created_at,
            record,
        );
        let outcome = self
            .merger
            .apply_version(head.as_ref().map(|head| &head.record), &version)?;
        let provenance_count = outcome.provenance.len();
        let version_id = version.id;

        self.store
            .put_baseline(VersionCommit {
                version,
                baseline: outcome.baseline.clone(),
                provenance: outcome.provenance,
                expected_head: head.map(|head| head.version_id),
            })
            .map_err(store_error)?;

        info!(
            "Committed version {} of project '{}': {} chunks ({} degraded), {} facts",
            version_id,
            request.project_id,
            batch.total,
            batch.degraded_count(),
            provenance_count
        );

        let mut conflicts = merge_report.conflicts;
        conflicts.extend(outcome.conflicts);
        Ok(IngestReport {
            version_id,
            kind: request.kind,
            content_hash,
            created_at,
            baseline: outcome.baseline,
            chunks: batch.total,
            degraded_chunks: batch.degraded_count(),
            used_fallback,
            reconcile: merge_report.reconcile,
            conflicts,
            warnings: outcome.warnings,
            provenance_count,
        })
    }

    /// Recompute a project's baseline from its stored versions
    pub fn rebuild_baseline(&self, project: &ProjectId) -> Result<RebuildReport, IngestError> {
        let versions = self.store.list_versions(project).map_err(store_error)?;
        let rebuilt = self.merger.fold_versions(&versions)?;
        let stored = self.store.get_baseline(project).map_err(store_error)?;
        Ok(RebuildReport {
            versions: versions.len(),
            rebuilt,
            stored,
        })
    }

    /// Check the version sequence and the document hash; returns the head
    fn check_admissible(
        &self,
        project: &ProjectId,
        kind: VersionKind,
        content_hash: &str,
    ) -> Result<Option<BaselineHead>, IngestError> {
        let head = self.store.get_head(project).map_err(store_error)?;
        VersionMerger::validate_sequence(head.is_some(), kind)?;

        if let Some(existing) = self
            .store
            .find_version_by_hash(project, content_hash)
            .map_err(store_error)?
        {
            return Err(ValidationError::DuplicateDocument {
                existing: existing.id,
            }
            .into());
        }
        Ok(head)
    }

    /// Fill an empty product list from the fallback source
    fn apply_fallback(
        &self,
        record: &mut ExtractedRecord,
        text: &str,
        report: &mut MergeReport,
    ) -> bool {
        let Some(source) = &self.fallback else {
            return false;
        };
        let config = self.merger.chunk_merger().config();
        let list_path = &config.product_list_path;
        let is_empty = record
            .get_path(list_path)
            .and_then(Value::as_array)
            .is_none_or(|items| items.is_empty());
        if !is_empty {
            return false;
        }

        debug!("Product list empty, consulting fallback source");
        let entries = source.line_items(text);
        if entries.is_empty() {
            warn!("Fallback source found no products either");
            return false;
        }

        let (entries, stats) = self.merger.chunk_merger().reconciler().reconcile_with_stats(entries);
        info!(
            "Fallback source supplied {} products ({} duplicates removed)",
            stats.final_count, stats.duplicates_removed
        );
        report.reconcile.absorb(stats);

        let items = entries.iter().map(|entry| entry.to_value()).collect();
        record.set_path(list_path, Value::Array(items));
        if let Some(parent) = list_path.parent() {
            record.set_path(
                &parent.child(EXTRACTION_METHOD_KEY),
                Value::string("fallback"),
            );
        }
        true
    }

    /// Creation time for the next version, strictly after the latest one
    fn next_timestamp(&self, project: &ProjectId) -> Result<u64, IngestError> {
        let latest = self
            .store
            .list_versions(project)
            .map_err(store_error)?
            .last()
            .map(|version| version.created_at);
        let now = now_millis();
        Ok(match latest {
            Some(latest) if latest >= now => latest + 1,
            _ => now,
        })
    }

    fn project_lock(&self, project: &ProjectId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(project.clone()).or_default())
    }
}

/// SHA-256 of the document text, hex encoded
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn store_error(e: impl Display) -> IngestError {
    IngestError::Store(e.to_string())
}

fn cancelled(batch: ChunkBatch) -> IngestError {
    let mut batch = batch;
    batch.partial = true;
    IngestError::Cancelled {
        completed: batch.completed(),
        total: batch.total,
        partial: Box::new(batch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("abc").len(), 64);
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn test_rebuild_report_consistency() {
        let report = RebuildReport {
            versions: 0,
            rebuilt: None,
            stored: None,
        };
        assert!(report.is_consistent());

        let report = RebuildReport {
            versions: 1,
            rebuilt: Some(ExtractedRecord::new()),
            stored: None,
        };
        assert!(!report.is_consistent());
    }
}
