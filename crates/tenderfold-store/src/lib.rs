//! Tenderfold Storage Layer
//!
//! Implements the `ProjectStore` trait for document versions, project
//! baselines and the provenance ledger.
//!
//! # Architecture
//!
//! - [`SqliteStore`]: SQLite tables for versions, baselines and provenance;
//!   a version commit is one transaction
//! - [`MemoryStore`]: the same contract behind a mutex, for tests and dry runs
//!
//! Both stores reject a version whose creation time is not after the
//! project's latest version, and both refuse a second version with the same
//! content hash in a project. A commit names the head version its baseline
//! was folded onto and is refused with [`StoreError::Conflict`] when another
//! writer moved the head in the meantime.
//!
//! # Examples
//!
//! ```no_run
//! use tenderfold_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for version commits
//! ```

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The project already has a version with this content hash
    #[error("Duplicate document in project '{project}': {content_hash}")]
    Duplicate {
        /// Project id
        project: String,
        /// Hash of the rejected document
        content_hash: String,
    },

    /// The write is not newer than what the project already holds
    #[error("Out of order write for project '{project}': {created_at} is not after {latest}")]
    OutOfOrder {
        /// Project id
        project: String,
        /// Timestamp of the rejected write
        created_at: u64,
        /// Latest timestamp already stored
        latest: u64,
    },

    /// The baseline moved on since the commit's fold read it
    #[error("Baseline of project '{project}' changed concurrently: folded onto {expected}, head is now {found}")]
    Conflict {
        /// Project id
        project: String,
        /// Head the commit was folded onto
        expected: String,
        /// Head found at commit time
        found: String,
    },

    /// A store lock was poisoned
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StoreError {
    /// Conflict between the head a commit expected and the one stored
    pub(crate) fn conflict(
        project: &tenderfold_domain::ProjectId,
        expected: Option<tenderfold_domain::VersionId>,
        found: Option<tenderfold_domain::VersionId>,
    ) -> Self {
        let label = |head: Option<tenderfold_domain::VersionId>| {
            head.map_or_else(|| "nothing".to_string(), |id| id.to_string())
        };
        StoreError::Conflict {
            project: project.to_string(),
            expected: label(expected),
            found: label(found),
        }
    }
}
