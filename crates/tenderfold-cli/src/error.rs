//! Error types for the CLI application.

use tenderfold_extractor::IngestError;
use tenderfold_merge::ValidationError;
use tenderfold_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion failed; nothing was committed
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    /// Stored versions cannot be folded
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Stored baseline disagrees with its versions
    #[error("Inconsistent project: {0}")]
    Inconsistent(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested project or section does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}
