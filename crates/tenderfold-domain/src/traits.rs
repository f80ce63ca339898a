//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the merge engine and the
//! capabilities it is handed: the extraction capability, the fallback line-item
//! source, the LLM behind the default extractor, and persistence.
//! Implementations live in other crates and are injected through constructors.

use crate::{
    DocumentVersion, ExtractedRecord, FieldPath, ProductEntry, ProjectId, ProvenanceRecord,
    VersionId,
};
use std::fmt;

/// Failure of a single extraction call
///
/// The classification drives the retry policy: transient failures are retried
/// and eventually degrade to an empty record, quota failures abort the whole
/// ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// Retryable (network error, timeout, unparsable output)
    Transient(String),
    /// Quota or rate limit exhausted; never retried
    FatalQuota(String),
}

impl ExtractionFailure {
    /// True for [`ExtractionFailure::FatalQuota`]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractionFailure::FatalQuota(_))
    }

    /// The failure message
    pub fn message(&self) -> &str {
        match self {
            ExtractionFailure::Transient(msg) | ExtractionFailure::FatalQuota(msg) => msg,
        }
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::Transient(msg) => write!(f, "Transient extraction error: {}", msg),
            ExtractionFailure::FatalQuota(msg) => write!(f, "Extraction quota exhausted: {}", msg),
        }
    }
}

impl std::error::Error for ExtractionFailure {}

/// Trait for analysing one chunk of document text
///
/// Implemented by the application layer (tenderfold-extractor). Calls are
/// blocking; the extraction client runs them on the blocking pool.
pub trait RecordExtractor: Send + Sync {
    /// Extract a structured record from a chunk
    ///
    /// `context_label` identifies the chunk (e.g. "part 2 of 5") for logging
    /// and prompting.
    fn extract(&self, text: &str, context_label: &str)
        -> Result<ExtractedRecord, ExtractionFailure>;
}

/// Trait for a pattern-based line-item source
///
/// Consulted only when the merged product list of a document is empty.
pub trait LineItemSource: Send + Sync {
    /// Find line items in the full document text
    fn line_items(&self, text: &str) -> Vec<ProductEntry>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (tenderfold-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured (JSON) output
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;
}

/// A project's baseline and the version that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineHead {
    /// Latest version folded into the baseline
    pub version_id: VersionId,
    /// The baseline record
    pub record: ExtractedRecord,
}

/// Everything a successful ingestion writes, committed as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct VersionCommit {
    /// The new document version
    pub version: DocumentVersion,
    /// The project's baseline after folding the version in
    pub baseline: ExtractedRecord,
    /// Facts contributed by the version
    pub provenance: Vec<ProvenanceRecord>,
    /// Head the baseline was folded onto; `None` for a project's first version
    pub expected_head: Option<VersionId>,
}

/// Trait for persisting projects, versions, baselines and provenance
///
/// Implemented by the infrastructure layer (tenderfold-store). Methods take
/// `&self`; implementations synchronize internally so one store can be shared
/// across concurrent ingestions.
pub trait ProjectStore: Send + Sync {
    /// Error type for store operations
    type Error;

    /// Current baseline of a project, `None` if the project has no versions
    fn get_baseline(&self, project: &ProjectId) -> Result<Option<ExtractedRecord>, Self::Error>;

    /// Current baseline of a project with the version id it was built up to
    fn get_head(&self, project: &ProjectId) -> Result<Option<BaselineHead>, Self::Error>;

    /// Write version, baseline and provenance atomically
    ///
    /// Fails without writing anything when the project's head is no longer
    /// `commit.expected_head`, when the version is not newer than the
    /// project's latest version, or when it repeats a stored content hash.
    fn put_baseline(&self, commit: VersionCommit) -> Result<(), Self::Error>;

    /// Append provenance records outside of a version commit
    fn append_provenance(&self, records: &[ProvenanceRecord]) -> Result<(), Self::Error>;

    /// All versions of a project, sorted by creation time
    fn list_versions(&self, project: &ProjectId) -> Result<Vec<DocumentVersion>, Self::Error>;

    /// Facts recorded at `path` or below it, oldest first
    fn section_history(
        &self,
        project: &ProjectId,
        path: &FieldPath,
    ) -> Result<Vec<ProvenanceRecord>, Self::Error>;

    /// Version of a project with the given content hash
    fn find_version_by_hash(
        &self,
        project: &ProjectId,
        content_hash: &str,
    ) -> Result<Option<DocumentVersion>, Self::Error>;

    /// All known project ids, sorted
    fn list_projects(&self) -> Result<Vec<ProjectId>, Self::Error>;

    /// Remove a project's versions, baseline and provenance
    ///
    /// Returns the number of versions removed.
    fn delete_project(&self, project: &ProjectId) -> Result<usize, Self::Error>;
}
