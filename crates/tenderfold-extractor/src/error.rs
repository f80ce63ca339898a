//! Error types for extraction and ingestion

use crate::client::ChunkBatch;
use tenderfold_merge::ValidationError;
use thiserror::Error;

/// Errors that stop chunk extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The extraction capability reported an exhausted quota
    #[error("Extraction quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A worker task panicked or was aborted
    #[error("Task join error: {0}")]
    Join(String),

    /// The model output was not a JSON object
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::InvalidFormat(e.to_string())
    }
}

/// Errors that abort an ingestion; none of them leaves a write behind
#[derive(Error, Debug)]
pub enum IngestError {
    /// The version cannot be applied to the project
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Extraction failed fatally
    #[error(transparent)]
    Extraction(#[from] ExtractorError),

    /// Persistence failed
    #[error("Store error: {0}")]
    Store(String),

    /// The caller cancelled before the commit
    #[error("Ingestion cancelled after {completed} of {total} chunks")]
    Cancelled {
        /// Chunks that finished before cancellation
        completed: usize,
        /// Chunks in the document
        total: usize,
        /// The records produced so far, marked partial
        partial: Box<ChunkBatch>,
    },
}

impl IngestError {
    /// True when the error came from an exhausted extraction quota
    pub fn is_quota(&self) -> bool {
        matches!(self, IngestError::Extraction(ExtractorError::QuotaExceeded(_)))
    }
}
