//! Tenderfold Domain Layer
//!
//! Core data model for the tender ingestion and reconciliation engine. Every
//! other crate in the workspace depends on the types and boundary traits
//! defined here; nothing here performs I/O.
//!
//! ## Key Concepts
//!
//! - **Value**: the tagged union every extracted field is expressed in
//! - **ExtractedRecord**: a map of named values, produced per chunk, per
//!   document, or as a project's running baseline
//! - **ProductEntry**: a line item living in the record's product list
//! - **DocumentVersion**: one immutable ingested document (base, amendment or
//!   reference update)
//! - **ProvenanceRecord**: one atomic fact with the document and time that
//!   contributed it
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Extraction, storage and merging live in other crates behind the traits
//!   in [`traits`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod path;
pub mod product;
pub mod provenance;
pub mod record;
pub mod traits;
pub mod value;
pub mod version;

// Re-exports for convenience
pub use path::FieldPath;
pub use product::ProductEntry;
pub use provenance::ProvenanceRecord;
pub use record::ExtractedRecord;
pub use traits::{
    BaselineHead, ExtractionFailure, LineItemSource, LlmProvider, ProjectStore, RecordExtractor,
    VersionCommit,
};
pub use value::{Value, ValueKind};
pub use version::{DocumentVersion, ProjectId, VersionId, VersionKind};
