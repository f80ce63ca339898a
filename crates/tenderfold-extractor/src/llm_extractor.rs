//! Extraction capability backed by an LLM provider

use crate::parser::parse_record;
use crate::prompt::{PromptBuilder, RECORD_SCHEMA};
use tenderfold_domain::{ExtractedRecord, ExtractionFailure, LlmProvider, RecordExtractor};
use tenderfold_llm::LlmError;
use tracing::debug;

/// Turns an [`LlmProvider`] into a [`RecordExtractor`]
///
/// Quota errors from the provider are fatal. Every other provider error and
/// any response that does not parse as a JSON object is transient.
pub struct LlmRecordExtractor<L> {
    llm: L,
}

impl<L> LlmRecordExtractor<L> {
    /// Wrap a provider
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &L {
        &self.llm
    }
}

/// Map a provider error to an extraction failure
pub fn classify_llm_error(error: LlmError) -> ExtractionFailure {
    if error.is_fatal() {
        ExtractionFailure::FatalQuota(error.to_string())
    } else {
        ExtractionFailure::Transient(error.to_string())
    }
}

impl<L> RecordExtractor for LlmRecordExtractor<L>
where
    L: LlmProvider<Error = LlmError> + Send + Sync,
{
    fn extract(
        &self,
        text: &str,
        context_label: &str,
    ) -> Result<ExtractedRecord, ExtractionFailure> {
        let prompt = PromptBuilder::new(text, context_label).build();
        debug!("Prompt for {}: {} chars", context_label, prompt.len());

        let response = self
            .llm
            .generate_structured(&prompt, RECORD_SCHEMA)
            .map_err(classify_llm_error)?;
        debug!("Response for {}: {} chars", context_label, response.len());

        parse_record(&response).map_err(|e| ExtractionFailure::Transient(e.to_string()))
    }
}
