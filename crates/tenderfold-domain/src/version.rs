//! Projects and document versions

use crate::record::ExtractedRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a document version based on UUIDv7
///
/// UUIDv7 sorts chronologically, so versions created later compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(u128);

impl VersionId {
    /// Generate a new UUIDv7-based VersionId
    ///
    /// # Examples
    ///
    /// ```
    /// use tenderfold_domain::VersionId;
    ///
    /// let id = VersionId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a VersionId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a VersionId from its hyphenated string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid version id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Identifier of a tender project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a project id; surrounding whitespace is dropped
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Borrow the id text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// What role a document plays in a project's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionKind {
    /// The original tender document; exactly one per project, always first
    Base,
    /// A corrigendum or amendment to the tender
    Amendment,
    /// Supporting reference material that updates the tender
    ReferenceUpdate,
}

impl VersionKind {
    /// Canonical storage name
    pub fn as_str(self) -> &'static str {
        match self {
            VersionKind::Base => "BASE",
            VersionKind::Amendment => "AMENDMENT",
            VersionKind::ReferenceUpdate => "REFERENCE_UPDATE",
        }
    }

    /// True for [`VersionKind::Base`]
    pub fn is_base(self) -> bool {
        matches!(self, VersionKind::Base)
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionKind {
    type Err = String;

    /// Accepts the canonical names plus the tender-desk aliases
    /// `BASE_RFP` and `CORRIGENDUM`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "BASE" | "BASE_RFP" => Ok(VersionKind::Base),
            "AMENDMENT" | "CORRIGENDUM" => Ok(VersionKind::Amendment),
            "REFERENCE_UPDATE" | "REFERENCE" => Ok(VersionKind::ReferenceUpdate),
            other => Err(format!("Unknown version kind: {}", other)),
        }
    }
}

/// One ingested document, immutable once stored
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentVersion {
    /// Unique identifier
    pub id: VersionId,

    /// Owning project
    pub project_id: ProjectId,

    /// SHA-256 of the document text, hex encoded
    pub content_hash: String,

    /// Role of the document
    pub kind: VersionKind,

    /// Creation time, milliseconds since the Unix epoch
    pub created_at: u64,

    /// File name the document was read from
    pub source_file: String,

    /// Document-level merged record
    pub record: ExtractedRecord,
}

impl DocumentVersion {
    /// Create a new version with a fresh id
    pub fn new(
        project_id: ProjectId,
        kind: VersionKind,
        content_hash: impl Into<String>,
        source_file: impl Into<String>,
        created_at: u64,
        record: ExtractedRecord,
    ) -> Self {
        Self {
            id: VersionId::new(),
            project_id,
            content_hash: content_hash.into(),
            kind,
            created_at,
            source_file: source_file.into(),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_id_chronological() {
        let id1 = VersionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = VersionId::new();
        assert!(id1 < id2);
    }

    #[test]
    fn test_version_id_display_and_parse() {
        let id = VersionId::new();
        let parsed = VersionId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(VersionId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_kind_parsing_accepts_aliases() {
        assert_eq!("BASE_RFP".parse::<VersionKind>().unwrap(), VersionKind::Base);
        assert_eq!("corrigendum".parse::<VersionKind>().unwrap(), VersionKind::Amendment);
        assert_eq!(
            "reference-update".parse::<VersionKind>().unwrap(),
            VersionKind::ReferenceUpdate
        );
        assert!("addendum".parse::<VersionKind>().is_err());
    }

    #[test]
    fn test_kind_round_trips_through_as_str() {
        for kind in [VersionKind::Base, VersionKind::Amendment, VersionKind::ReferenceUpdate] {
            assert_eq!(kind.as_str().parse::<VersionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_project_id_trims() {
        assert_eq!(ProjectId::new("  metro-hvac ").as_str(), "metro-hvac");
    }
}
