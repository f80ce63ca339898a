//! Bounded retry with linear backoff
//!
//! Each chunk runs through a small state machine:
//!
//! ```text
//! Attempting(n) ──ok──────────────► Success
//!      │
//!      ├─transient, n < max──────► Retry(n + 1) after (n + 1) * step
//!      ├─transient, n = max──────► Exhausted
//!      └─quota───────────────────► Fatal
//! ```
//!
//! The policy only decides; sleeping and cancellation belong to the caller.

use std::time::Duration;
use tenderfold_domain::ExtractionFailure;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again as attempt `attempt` after waiting `delay`
    Retry {
        /// Zero-based number of the next attempt
        attempt: u32,
        /// Backoff before the next attempt
        delay: Duration,
    },
    /// Retries used up; the chunk degrades to an empty record
    Exhausted,
    /// Never retried; the whole ingestion stops
    Fatal,
}

/// Retry policy for one extraction call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_step: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries after the first attempt
    pub fn new(max_retries: u32, backoff_step: Duration) -> Self {
        Self {
            max_retries,
            backoff_step,
        }
    }

    /// Retries allowed after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total calls made before a transient failure is given up on
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_step.saturating_mul(retry)
    }

    /// Decide what follows a failure of zero-based attempt `attempt`
    pub fn decide(&self, attempt: u32, failure: &ExtractionFailure) -> RetryDecision {
        if failure.is_fatal() {
            return RetryDecision::Fatal;
        }
        if attempt >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        let next = attempt + 1;
        RetryDecision::Retry {
            attempt: next,
            delay: self.delay_for(next),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}
