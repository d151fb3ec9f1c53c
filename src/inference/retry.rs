//! Retry policy for remote predictions.
//!
//! A [`RetryPolicy`] decides how many times a prediction is attempted, which
//! failures earn another attempt, and how long to wait in between. The wait is
//! a pure function of the attempt number ([`Backoff::delay_for`]) so it can be
//! checked without a clock.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::InferenceError;

/// Delay strategy between consecutive attempts.
///
/// # Example TOML
///
/// ```toml
/// backoff = { kind = "fixed", delay_ms = 1000 }
/// backoff = { kind = "linear", step_ms = 500 }
/// backoff = { kind = "exponential", base_ms = 250, max_ms = 4000 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed { delay_ms: u64 },
    /// `attempt * step_ms`.
    Linear { step_ms: u64 },
    /// `base_ms * 2^(attempt - 1)`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed { delay_ms: 1000 }
    }
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let millis = match *self {
            Self::Fixed { delay_ms } => delay_ms,
            Self::Linear { step_ms } => step_ms.saturating_mul(u64::from(attempt)),
            Self::Exponential { base_ms, max_ms } => {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                base_ms.saturating_mul(factor).min(max_ms)
            }
        };
        Duration::from_millis(millis)
    }
}

/// Attempt ceiling, error filter and backoff for the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Retry every failure, permanent ones included
    pub retry_all_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            retry_all_errors: false,
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, error: &InferenceError) -> bool {
        self.retry_all_errors || error.is_retryable()
    }
}
