//! Error types for the merge engine

use tenderfold_domain::VersionId;
use thiserror::Error;

/// An invalid version sequence for a project
///
/// Raised before any extraction work starts and again inside the project's
/// critical section, so a rejected document never changes the baseline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The first version of a project was not a base version
    #[error("project must start with a base version")]
    MissingBase,

    /// A second base version was submitted
    #[error("base version already exists")]
    DuplicateBase,

    /// The same document text was already ingested for the project
    #[error("document already ingested as version {existing}")]
    DuplicateDocument {
        /// Version holding the same content
        existing: VersionId,
    },

    /// A version being folded belongs to another project
    #[error("version belongs to project '{found}', expected '{expected}'")]
    ProjectMismatch {
        /// Project being folded
        expected: String,
        /// Project on the version
        found: String,
    },
}
