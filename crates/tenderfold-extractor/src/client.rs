//! Concurrent chunk extraction with retry, timeout and cancellation

use crate::chunking::ChunkSplitter;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::retry::{RetryDecision, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tenderfold_domain::{ExtractedRecord, ExtractionFailure, FieldPath, RecordExtractor};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of extracting one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    /// Position of the chunk in the document
    pub index: usize,
    /// Extracted record, or the empty skeleton if the chunk degraded
    pub record: ExtractedRecord,
    /// Calls made for this chunk
    pub attempts: u32,
    /// True when retries were exhausted and `record` is the skeleton
    pub degraded: bool,
}

/// Records for a document's chunks, ordered by chunk index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkBatch {
    /// Finished chunks in index order
    pub chunks: Vec<ChunkOutcome>,
    /// Number of chunks the document was split into
    pub total: usize,
    /// True when cancellation stopped the batch before every chunk finished
    pub partial: bool,
}

impl ChunkBatch {
    /// Number of finished chunks
    pub fn completed(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks that degraded to the skeleton
    pub fn degraded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.degraded).count()
    }

    /// The records, in chunk order
    pub fn records(&self) -> Vec<ExtractedRecord> {
        self.chunks.iter().map(|c| c.record.clone()).collect()
    }
}

/// How one chunk's retry loop ended
enum ChunkRun {
    Extracted { record: ExtractedRecord, attempts: u32 },
    Degraded { attempts: u32 },
    Fatal(String),
    Cancelled,
}

/// Runs a [`RecordExtractor`] over the chunks of a document
///
/// Blocking extractor calls go to the blocking pool, at most `concurrency`
/// at a time. A call holds its slot until it returns, so a call abandoned by
/// the timeout still counts against the bound. A timeout is a transient
/// failure. Transient failures are retried per [`RetryPolicy`] and
/// then degrade to the skeleton record. A quota failure stops every other
/// chunk and fails the batch.
pub struct ExtractionClient<E: RecordExtractor + 'static> {
    extractor: Arc<E>,
    config: ExtractorConfig,
    skeleton: ExtractedRecord,
}

impl<E: RecordExtractor + 'static> ExtractionClient<E> {
    /// Create a client; `product_list_path` is left as an empty list in the skeleton
    pub fn new(extractor: E, config: ExtractorConfig, product_list_path: &FieldPath) -> Self {
        Self::from_arc(Arc::new(extractor), config, product_list_path)
    }

    /// Create a client sharing an extractor
    pub fn from_arc(extractor: Arc<E>, config: ExtractorConfig, product_list_path: &FieldPath) -> Self {
        let skeleton = ExtractedRecord::skeleton(&config.skeleton_sections, Some(product_list_path));
        Self {
            extractor,
            config,
            skeleton,
        }
    }

    /// The record used for a chunk whose retries ran out
    pub fn skeleton(&self) -> &ExtractedRecord {
        &self.skeleton
    }

    /// Client configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Split `text` and extract every chunk
    pub async fn extract_document(
        &self,
        text: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<ChunkBatch, ExtractorError> {
        let chunks = ChunkSplitter::new(self.config.max_chunk_size).split(text);
        info!("Split '{}' into {} chunks", label, chunks.len());
        self.extract_chunks(chunks, label, cancel).await
    }

    /// Extract already split chunks
    ///
    /// Cancelling `cancel` stops new calls and interrupts backoff sleeps;
    /// calls already running finish and are kept. The batch is then returned
    /// with `partial` set.
    pub async fn extract_chunks(
        &self,
        chunks: Vec<String>,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<ChunkBatch, ExtractorError> {
        let total = chunks.len();
        let policy = self.config.retry_policy();
        let limit = self.config.extraction_timeout();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        // Cancelled by a fatal chunk; never propagates to the caller's token
        let stop = cancel.child_token();
        let mut tasks = JoinSet::new();

        for (index, text) in chunks.into_iter().enumerate() {
            let extractor = Arc::clone(&self.extractor);
            let semaphore = Arc::clone(&semaphore);
            let stop = stop.clone();
            let chunk_label = format!("{} (Part {}/{})", label, index + 1, total);

            tasks.spawn(async move {
                let run =
                    run_chunk(extractor, semaphore, policy, limit, text, chunk_label, &stop).await;
                (index, run)
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let (index, run) = joined.map_err(|e| ExtractorError::Join(e.to_string()))?;
            match run {
                ChunkRun::Extracted { record, attempts } => outcomes.push(ChunkOutcome {
                    index,
                    record,
                    attempts,
                    degraded: false,
                }),
                ChunkRun::Degraded { attempts } => outcomes.push(ChunkOutcome {
                    index,
                    record: self.skeleton.clone(),
                    attempts,
                    degraded: true,
                }),
                ChunkRun::Fatal(message) => {
                    tasks.abort_all();
                    return Err(ExtractorError::QuotaExceeded(message));
                }
                ChunkRun::Cancelled => {}
            }
        }

        outcomes.sort_by_key(|o| o.index);
        let batch = ChunkBatch {
            partial: outcomes.len() < total,
            chunks: outcomes,
            total,
        };
        if batch.partial {
            info!(
                "Extraction of '{}' cancelled after {} of {} chunks",
                label,
                batch.completed(),
                total
            );
        } else {
            info!(
                "Extracted {} chunks of '{}' ({} degraded)",
                total,
                label,
                batch.degraded_count()
            );
        }
        Ok(batch)
    }
}

/// Retry loop for one chunk
///
/// `stop` is cancelled here on a fatal failure, before the call's slot is
/// released, so no other chunk starts a call afterwards.
async fn run_chunk<E: RecordExtractor + 'static>(
    extractor: Arc<E>,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
    limit: Duration,
    text: String,
    label: String,
    stop: &CancellationToken,
) -> ChunkRun {
    let text = Arc::new(text);
    let mut attempt = 0u32;

    loop {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => return ChunkRun::Cancelled,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return ChunkRun::Cancelled,
            },
        };
        if stop.is_cancelled() {
            return ChunkRun::Cancelled;
        }
        debug!("Extracting {} (attempt {}/{})", label, attempt + 1, policy.max_attempts());

        let (result, permit) = call_extractor(&extractor, &text, &label, limit, permit).await;
        let failure = match result {
            Ok(record) => {
                return ChunkRun::Extracted {
                    record,
                    attempts: attempt + 1,
                }
            }
            Err(failure) => failure,
        };

        match policy.decide(attempt, &failure) {
            RetryDecision::Fatal => {
                error!("Stopping extraction at {}: {}", label, failure);
                stop.cancel();
                drop(permit);
                return ChunkRun::Fatal(failure.message().to_string());
            }
            RetryDecision::Exhausted => {
                warn!(
                    "Failed to extract {} after {} attempts, using empty record: {}",
                    label,
                    attempt + 1,
                    failure
                );
                return ChunkRun::Degraded {
                    attempts: attempt + 1,
                };
            }
            RetryDecision::Retry { attempt: next, delay } => {
                drop(permit);
                warn!("Retrying {} in {:?}: {}", label, delay, failure);
                tokio::select! {
                    _ = stop.cancelled() => return ChunkRun::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt = next;
            }
        }
    }
}

/// One extractor call on the blocking pool, bounded by `limit`
///
/// The permit moves into the blocking call and comes back with its result.
/// On a timeout it stays with the abandoned call and is released only when
/// that call returns.
async fn call_extractor<E: RecordExtractor + 'static>(
    extractor: &Arc<E>,
    text: &Arc<String>,
    label: &str,
    limit: Duration,
    permit: OwnedSemaphorePermit,
) -> (
    Result<ExtractedRecord, ExtractionFailure>,
    Option<OwnedSemaphorePermit>,
) {
    let extractor = Arc::clone(extractor);
    let text = Arc::clone(text);
    let context_label = label.to_string();
    let call = tokio::task::spawn_blocking(move || {
        let result = extractor.extract(&text, &context_label);
        (result, permit)
    });

    match tokio::time::timeout(limit, call).await {
        Ok(Ok((result, permit))) => (result, Some(permit)),
        Ok(Err(e)) => (
            Err(ExtractionFailure::Transient(format!("Task join error: {}", e))),
            None,
        ),
        Err(_) => {
            warn!("{} still running after {:?}, abandoning the call", label, limit);
            (
                Err(ExtractionFailure::Transient(format!(
                    "Extraction timed out after {:?}",
                    limit
                ))),
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    impl RecordExtractor for Echo {
        fn extract(&self, text: &str, _label: &str) -> Result<ExtractedRecord, ExtractionFailure> {
            let mut record = ExtractedRecord::new();
            record.insert("text", text.into());
            Ok(record)
        }
    }

    struct AlwaysTransient(AtomicUsize);

    impl RecordExtractor for AlwaysTransient {
        fn extract(&self, _text: &str, _label: &str) -> Result<ExtractedRecord, ExtractionFailure> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ExtractionFailure::Transient("bad gateway".into()))
        }
    }

    /// Sleeps past the timeout and records how many calls overlap
    #[derive(Default)]
    struct Sluggish {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl RecordExtractor for Sluggish {
        fn extract(&self, _text: &str, _label: &str) -> Result<ExtractedRecord, ExtractionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1500));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(ExtractedRecord::new())
        }
    }

    fn fast_config() -> ExtractorConfig {
        ExtractorConfig {
            backoff_step_ms: 1,
            ..ExtractorConfig::default()
        }
    }

    fn product_path() -> FieldPath {
        FieldPath::parse("productMapping.miiProductStatus").unwrap()
    }

    #[tokio::test]
    async fn test_results_in_chunk_order() {
        let client = ExtractionClient::new(Echo, fast_config(), &product_path());
        let chunks: Vec<String> = (0..10).map(|i| format!("chunk-{}", i)).collect();

        let batch = client
            .extract_chunks(chunks.clone(), "doc", &CancellationToken::new())
            .await
            .unwrap();

        assert!(!batch.partial);
        assert_eq!(batch.total, 10);
        let texts: Vec<String> = batch
            .records()
            .iter()
            .map(|r| r.get("text").unwrap().to_display_string())
            .collect();
        assert_eq!(texts, chunks);
    }

    #[tokio::test]
    async fn test_exhausted_chunk_degrades_to_skeleton() {
        let extractor = Arc::new(AlwaysTransient(AtomicUsize::new(0)));
        let client = ExtractionClient::from_arc(Arc::clone(&extractor), fast_config(), &product_path());

        let batch = client
            .extract_chunks(vec!["x".into()], "doc", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(extractor.0.load(Ordering::SeqCst), 3);
        let chunk = &batch.chunks[0];
        assert!(chunk.degraded);
        assert_eq!(chunk.attempts, 3);
        assert_eq!(&chunk.record, client.skeleton());
        assert_eq!(
            client.skeleton().get_path(&product_path()),
            Some(&tenderfold_domain::Value::empty_array())
        );
    }

    #[tokio::test]
    async fn test_empty_document() {
        let client = ExtractionClient::new(Echo, fast_config(), &product_path());
        let batch = client
            .extract_document("", "doc", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(batch.total, 0);
        assert!(!batch.partial);
        assert!(batch.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_precancelled_makes_no_calls() {
        let extractor = Arc::new(AlwaysTransient(AtomicUsize::new(0)));
        let client = ExtractionClient::from_arc(Arc::clone(&extractor), fast_config(), &product_path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let batch = client
            .extract_chunks(vec!["a".into(), "b".into()], "doc", &cancel)
            .await
            .unwrap();

        assert!(batch.partial);
        assert_eq!(batch.completed(), 0);
        assert_eq!(extractor.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timed_out_call_keeps_its_slot() {
        let extractor = Arc::new(Sluggish::default());
        let config = ExtractorConfig {
            concurrency: 1,
            max_retries: 1,
            extraction_timeout_secs: 1,
            ..fast_config()
        };
        let client = ExtractionClient::from_arc(Arc::clone(&extractor), config, &product_path());

        let batch = client
            .extract_chunks(vec!["x".into()], "doc", &CancellationToken::new())
            .await
            .unwrap();

        assert!(batch.chunks[0].degraded);
        assert_eq!(batch.chunks[0].attempts, 2);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(extractor.peak.load(Ordering::SeqCst), 1);
    }
}
