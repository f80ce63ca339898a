//! Ollama Provider Implementation
//!
//! Integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - JSON mode for structured output
//! - Quota and rate-limit responses classified as fatal
//! - Blocking trait implementation usable from the blocking thread pool
//!
//! # Examples
//!
//! ```no_run
//! use tenderfold_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3");
//! ```

use crate::{is_quota_message, LlmError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tenderfold_domain::traits::LlmProvider as LlmProviderTrait;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: build_client(timeout),
            timeout,
        }
    }

    /// Create a new Ollama provider at `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    /// Generate text using the Ollama API
    ///
    /// `format` is passed through to Ollama; `Some("json")` enables JSON mode.
    ///
    /// # Errors
    ///
    /// - [`LlmError::QuotaExceeded`] for HTTP 429 or a quota message
    /// - [`LlmError::ModelNotAvailable`] for HTTP 404
    /// - [`LlmError::Communication`] when Ollama is unreachable or fails
    /// - [`LlmError::InvalidResponse`] when the body cannot be decoded
    pub async fn generate_async(
        &self,
        prompt: &str,
        format: Option<&str>,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
        };

        debug!("Ollama request: model={} prompt_chars={}", self.model, prompt.len());
        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<OllamaGenerateResponse>()
                .await
                .map(|body| body.response)
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(classify_failure(status, &error_text))
    }

    fn block_on_generate(&self, prompt: &str, format: Option<&str>) -> Result<String, LlmError> {
        // Inside the blocking pool the ambient runtime can be reused; elsewhere
        // a private current-thread runtime drives the request.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.generate_async(prompt, format)),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?
                .block_on(self.generate_async(prompt, format)),
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a failed HTTP response to an error
fn classify_failure(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = format!("HTTP {}: {}", status, body);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || is_quota_message(body) {
        LlmError::QuotaExceeded(message)
    } else {
        LlmError::Communication(message)
    }
}

impl LlmProviderTrait for OllamaProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.block_on_generate(prompt, None)
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        self.block_on_generate(prompt, Some("json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3");
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model, "llama3");
        assert_eq!(provider.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, "mistral");
    }

    #[test]
    fn test_ollama_provider_with_timeout() {
        let provider =
            OllamaProvider::default_endpoint("llama3").with_timeout(Duration::from_secs(5));
        assert_eq!(provider.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_classify_failure() {
        assert!(classify_failure(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down").is_fatal());
        assert!(classify_failure(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": {"code": "insufficient_quota"}}"#
        )
        .is_fatal());
        assert!(matches!(
            classify_failure(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            LlmError::Communication(_)
        ));
    }

    #[test]
    fn test_request_body_json_mode() {
        let body = OllamaGenerateRequest {
            model: "llama3",
            prompt: "p",
            stream: false,
            format: Some("json"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");

        let plain = OllamaGenerateRequest { format: None, ..body };
        assert!(serde_json::to_value(&plain).unwrap().get("format").is_none());
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Invalid port triggers a request error
        let provider = OllamaProvider::new("http://localhost:99999", "llama3");
        let result = provider.generate_async("test", None).await;

        match result {
            Err(LlmError::Communication(_)) => {}
            other => panic!("Expected Communication error, got {:?}", other),
        }
    }

    #[test]
    fn test_blocking_trait_call_without_runtime() {
        let provider = OllamaProvider::new("http://localhost:99999", "llama3");
        assert!(matches!(
            LlmProviderTrait::generate(&provider, "test"),
            Err(LlmError::Communication(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_generate_integration() {
        let provider = OllamaProvider::default_endpoint("llama3");
        if let Ok(response) = provider.generate_async("Say 'hello' and nothing else", None).await {
            assert!(!response.is_empty());
        }
    }
}
