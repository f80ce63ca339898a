//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::config::{Config, LlmBackend};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::fs;
use std::sync::Arc;
use tenderfold_domain::{ProjectId, ProjectStore, RecordExtractor};
use tenderfold_extractor::{
    IngestReport, IngestRequest, Ingestor, LlmRecordExtractor, PatternLineItemSource,
};
use tenderfold_llm::{MockProvider, OllamaProvider};
use tenderfold_store::StoreError;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Execute the ingest command.
pub async fn execute_ingest<S>(
    args: IngestArgs,
    store: Arc<S>,
    config: &Config,
    formatter: &Formatter,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: ProjectStore<Error = StoreError> + 'static,
{
    if args.project.trim().is_empty() {
        return Err(CliError::InvalidInput("Project id must not be empty".to_string()));
    }

    let text = fs::read_to_string(&args.file)?;
    let source_file = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let request = IngestRequest {
        project_id: ProjectId::new(args.project.trim()),
        kind: args.kind.into(),
        source_file,
        text,
    };
    let backend = args.llm.map(Into::into).unwrap_or(config.llm.backend);
    let fallback = config.llm.fallback && !args.no_fallback;

    let report = match backend {
        LlmBackend::Mock => {
            // Empty records only: the fallback source does all the work
            let extractor = LlmRecordExtractor::new(MockProvider::new("{}"));
            ingest_document(extractor, store, config, fallback, request, cancel).await?
        }
        LlmBackend::Ollama => {
            info!(
                "Using Ollama model '{}' at {}",
                config.llm.model, config.llm.endpoint
            );
            let provider = OllamaProvider::new(&config.llm.endpoint, &config.llm.model)
                .with_timeout(config.extractor.extraction_timeout());
            let extractor = LlmRecordExtractor::new(provider);
            ingest_document(extractor, store, config, fallback, request, cancel).await?
        }
    };

    println!("{}", formatter.format_ingest_report(&report)?);
    Ok(())
}

/// Run one document through the pipeline with the given extractor.
pub async fn ingest_document<E, S>(
    extractor: E,
    store: Arc<S>,
    config: &Config,
    fallback: bool,
    request: IngestRequest,
    cancel: &CancellationToken,
) -> Result<IngestReport>
where
    E: RecordExtractor + 'static,
    S: ProjectStore<Error = StoreError> + 'static,
{
    let mut ingestor = Ingestor::new(
        extractor,
        store,
        config.extractor.clone(),
        config.merge.clone(),
    );
    if fallback {
        ingestor = ingestor.with_fallback(PatternLineItemSource::new());
    }
    Ok(ingestor.ingest(request, cancel).await?)
}
