//! Tenderfold LLM Provider Layer
//!
//! Pluggable LLM providers behind the `LlmProvider` trait from
//! `tenderfold-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: deterministic, scriptable mock for tests
//! - `OllamaProvider`: local Ollama API integration
//!
//! # Error classification
//!
//! Providers never retry on their own. They report what went wrong and
//! [`LlmError::is_fatal`] tells the caller whether a retry can help: an
//! exhausted quota (HTTP 429 or `insufficient_quota`) cannot.
//!
//! # Examples
//!
//! ```
//! use tenderfold_llm::MockProvider;
//! use tenderfold_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new(r#"{"projectOverview": {}}"#);
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, r#"{"projectOverview": {}}"#);
//! ```

#![warn(missing_docs)]

pub mod ollama;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tenderfold_domain::traits::LlmProvider as LlmProviderTrait;
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Quota or rate limit exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// True when retrying cannot succeed and the whole job should stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, LlmError::QuotaExceeded(_))
    }

    /// Classify an error message reported by a provider
    ///
    /// Messages mentioning `insufficient_quota` or status 429 are quota
    /// errors; everything else is a communication error.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_message(&message) {
            LlmError::QuotaExceeded(message)
        } else {
            LlmError::Communication(message)
        }
    }
}

/// True if a provider message reports an exhausted quota
pub fn is_quota_message(message: &str) -> bool {
    message.contains("insufficient_quota") || message.contains("429")
}

/// One scripted reply of a [`MockProvider`]
#[derive(Debug, Clone)]
enum Scripted {
    Response(String),
    Error(LlmError),
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, String>,
    contains: Vec<(String, Scripted)>,
    queue: VecDeque<Scripted>,
    call_count: usize,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are chosen in this order: the next scripted reply from the queue,
/// a reply registered for the exact prompt, a reply registered for a
/// substring of the prompt, then the default response. Clones share state.
///
/// # Examples
///
/// ```
/// use tenderfold_llm::{LlmError, MockProvider};
/// use tenderfold_domain::traits::LlmProvider;
///
/// let provider = MockProvider::new("{}");
/// provider.push_error(LlmError::Communication("connection reset".into()));
/// provider.push_response(r#"{"legal": {}}"#);
///
/// assert!(provider.generate("chunk").is_err());
/// assert_eq!(provider.generate("chunk").unwrap(), r#"{"legal": {}}"#);
/// assert_eq!(provider.generate("chunk").unwrap(), "{}");
/// assert_eq!(provider.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Sleep this long before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state().responses.insert(prompt.into(), response.into());
    }

    /// Reply with `response` whenever the prompt contains `needle`
    pub fn respond_when_contains(&self, needle: impl Into<String>, response: impl Into<String>) {
        self.state()
            .contains
            .push((needle.into(), Scripted::Response(response.into())));
    }

    /// Fail with `error` whenever the prompt contains `needle`
    pub fn fail_when_contains(&self, needle: impl Into<String>, error: LlmError) {
        self.state()
            .contains
            .push((needle.into(), Scripted::Error(error)));
    }

    /// Queue a response for the next call
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().queue.push_back(Scripted::Response(response.into()));
    }

    /// Queue an error for the next call
    pub fn push_error(&self, error: LlmError) {
        self.state().queue.push_back(Scripted::Error(error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.state().call_count
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.state().call_count = 0;
    }

    fn reply(&self, prompt: &str) -> Scripted {
        let mut state = self.state();
        state.call_count += 1;

        if let Some(next) = state.queue.pop_front() {
            return next;
        }
        if let Some(response) = state.responses.get(prompt) {
            return Scripted::Response(response.clone());
        }
        if let Some((_, scripted)) = state
            .contains
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
        {
            return scripted.clone();
        }
        Scripted::Response(self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let reply = self.reply(prompt);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match reply {
            Scripted::Response(response) => Ok(response),
            Scripted::Error(error) => Err(error),
        }
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        self.generate(prompt)
    }
}
