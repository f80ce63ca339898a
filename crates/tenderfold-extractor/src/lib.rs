//! Tenderfold Extractor
//!
//! Turns tender documents into project versions: chunked extraction with
//! retries, merging of the chunk records, an optional pattern-based product
//! fallback, and the atomic commit of the new baseline.
//!
//! # Overview
//!
//! A document is split into fixed-size chunks and each chunk is handed to a
//! [`RecordExtractor`](tenderfold_domain::RecordExtractor). Transient failures
//! are retried with linear backoff and then replaced by an empty record, so
//! the merger always sees one record per chunk. A quota failure aborts the
//! ingestion. The merged document record is folded onto the project baseline
//! and stored together with its provenance in one commit.
//!
//! # Architecture
//!
//! ```text
//! Ingestor ─► ChunkSplitter ─► ExtractionClient ─► RecordExtractor (LLM)
//!    │                                  │
//!    │                             RetryPolicy
//!    ├─► ChunkMerger ─► PatternLineItemSource (empty product list only)
//!    └─► VersionMerger ─► ProjectStore
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tenderfold_extractor::{
//!     ExtractorConfig, IngestRequest, Ingestor, LlmRecordExtractor, PatternLineItemSource,
//! };
//! use tenderfold_domain::{ProjectId, VersionKind};
//! use tenderfold_llm::MockProvider;
//! use tenderfold_merge::MergeConfig;
//! use tenderfold_store::MemoryStore;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = LlmRecordExtractor::new(MockProvider::new("{}"));
//! let store = Arc::new(MemoryStore::new());
//! let ingestor = Ingestor::new(extractor, store, ExtractorConfig::default(), MergeConfig::default())
//!     .with_fallback(PatternLineItemSource::new());
//!
//! let request = IngestRequest {
//!     project_id: ProjectId::new("metro-hvac"),
//!     kind: VersionKind::Base,
//!     source_file: "rfp.pdf".to_string(),
//!     text: "Bill of Quantities ...".to_string(),
//! };
//! let report = ingestor.ingest(request, &CancellationToken::new()).await?;
//! println!("Committed {} with {} facts", report.version_id, report.provenance_count);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod client;
mod config;
mod error;
mod fallback;
mod ingest;
mod llm_extractor;
mod parser;
mod prompt;
mod retry;


pub use chunking::ChunkSplitter;
pub use client::{ChunkBatch, ChunkOutcome, ExtractionClient};
pub use config::{ExtractorConfig, DEFAULT_SECTIONS};
pub use error::{ExtractorError, IngestError};
pub use fallback::{PatternLineItemSource, FALLBACK_SOURCE};
pub use ingest::{
    content_hash, IngestReport, IngestRequest, Ingestor, RebuildReport, EXTRACTION_METHOD_KEY,
};
pub use llm_extractor::{classify_llm_error, LlmRecordExtractor};
pub use parser::parse_record;
pub use prompt::{PromptBuilder, RECORD_SCHEMA};
pub use retry::{RetryDecision, RetryPolicy};
