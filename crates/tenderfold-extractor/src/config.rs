//! Configuration for chunked extraction

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level sections every record is expected to carry
pub const DEFAULT_SECTIONS: [&str; 8] = [
    "projectOverview",
    "bidManagement",
    "technical",
    "commercial",
    "finance",
    "legal",
    "scm",
    "productMapping",
];

/// Configuration for the extraction client and ingestion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum chunk size (characters)
    pub max_chunk_size: usize,

    /// Retries after the first attempt for a transient failure
    pub max_retries: u32,

    /// Backoff step; retry `n` waits `n * step`
    pub backoff_step_ms: u64,

    /// Chunks extracted at the same time; 1 is sequential
    pub concurrency: usize,

    /// Maximum time for a single extraction call (seconds)
    pub extraction_timeout_secs: u64,

    /// Sections of the empty record used for a chunk that could not be analysed
    pub skeleton_sections: Vec<String>,
}

impl ExtractorConfig {
    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Get the backoff step as a Duration
    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }

    /// Retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_step())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        if self.skeleton_sections.iter().any(|s| s.trim().is_empty()) {
            return Err("skeleton_sections cannot contain empty names".to_string());
        }
        Ok(())
    }

    /// Aggressive preset: smaller chunks, more parallelism, one retry
    pub fn aggressive() -> Self {
        Self {
            max_chunk_size: 50_000,
            max_retries: 1,
            backoff_step_ms: 500,
            concurrency: 8,
            extraction_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Lenient preset: sequential calls with long timeouts
    pub fn lenient() -> Self {
        Self {
            max_chunk_size: 200_000,
            max_retries: 3,
            backoff_step_ms: 2_000,
            concurrency: 1,
            extraction_timeout_secs: 300,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 150_000,
            max_retries: 2,
            backoff_step_ms: 1_000,
            concurrency: 4,
            extraction_timeout_secs: 120,
            skeleton_sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_default_retry_schedule() {
        let config = ExtractorConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.backoff_step(), Duration::from_secs(1));
        assert_eq!(config.retry_policy().max_retries(), 2);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ExtractorConfig::default();
        config.max_chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.extraction_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.skeleton_sections.push(" ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::aggressive();
        let parsed = ExtractorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml("concurrency = 1").unwrap();
        assert_eq!(parsed.concurrency, 1);
        assert_eq!(parsed.max_chunk_size, 150_000);
        assert_eq!(parsed.skeleton_sections.len(), DEFAULT_SECTIONS.len());
    }
}
