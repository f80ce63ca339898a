//! Provenance tracking for extracted facts

use crate::path::FieldPath;
use crate::version::{ProjectId, VersionId, VersionKind};

/// A single atomic fact and the document that contributed it
///
/// Records are append-only: they are never updated, and only a full project
/// delete removes them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceRecord {
    /// Owning project
    pub project_id: ProjectId,

    /// Document version the fact was extracted from
    pub document_id: VersionId,

    /// Dotted path of the section holding the fact
    pub section_path: FieldPath,

    /// The fact, rendered as text
    pub content: String,

    /// Kind of the contributing document
    pub source_kind: VersionKind,

    /// File name of the contributing document
    pub source_file: String,

    /// When the contributing version was created (ms since epoch)
    pub created_at: u64,
}

impl ProvenanceRecord {
    /// Create a new provenance record
    pub fn new(
        project_id: ProjectId,
        document_id: VersionId,
        section_path: FieldPath,
        content: impl Into<String>,
        source_kind: VersionKind,
        source_file: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            project_id,
            document_id,
            section_path,
            content: content.into(),
            source_kind,
            source_file: source_file.into(),
            created_at,
        }
    }
}
