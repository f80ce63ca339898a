//! Tenderfold Merge Engine
//!
//! Reassembles chunk-level extractions into document records and folds
//! document versions into a project's canonical baseline.
//!
//! # Overview
//!
//! - [`ChunkMerger`] merges an ordered sequence of partial records into one
//! - [`ProductReconciler`] resolves near-duplicate product entries by fuzzy
//!   name and OEM matching
//! - [`VersionMerger`] applies a new document version to the running
//!   baseline, enforcing the single-base rule and the deposit/bid value check
//! - [`ProvenanceLedger`] explodes a record into atomic, attributed facts
//!
//! # Architecture
//!
//! ```text
//! chunk records ──► ChunkMerger ──► document record
//!                       │
//!                       └─► ProductReconciler (product list path)
//!
//! document record + baseline ──► VersionMerger ──► new baseline
//!                                     │
//!                                     └─► ProvenanceLedger ──► facts
//! ```
//!
//! Everything here is synchronous and free of I/O; serializing access to a
//! project's baseline is the caller's job.
//!
//! # Example
//!
//! ```
//! use tenderfold_domain::ExtractedRecord;
//! use tenderfold_merge::ChunkMerger;
//!
//! let first = ExtractedRecord::from_json_str(r#"{"bidValue": "₹10,00,000"}"#).unwrap();
//! let second = ExtractedRecord::from_json_str(r#"{"bidValue": ""}"#).unwrap();
//!
//! let merged = ChunkMerger::default().merge(&[first.clone(), second]);
//! assert_eq!(merged, first);
//! ```

#![warn(missing_docs)]

mod config;
mod consistency;
mod error;
mod provenance;
mod reconcile;
mod similarity;
mod structural;
mod version;

pub use config::{ConsistencyConfig, MergeConfig, ReconcileConfig};
pub use consistency::{check_consistency, parse_amount, ConsistencyWarning};
pub use error::ValidationError;
pub use provenance::ProvenanceLedger;
pub use reconcile::{merge_specifications, refresh_product_stats, ProductReconciler, ReconcileStats};
pub use similarity::{edit_distance, similarity};
pub use structural::{ChunkMerger, MergeReport, MergeTypeConflict};
pub use version::{VersionMerger, VersionOutcome};
