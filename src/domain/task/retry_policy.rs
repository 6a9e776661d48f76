//! Exponential backoff policy for task delivery attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy carried inside each envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub backoff_ms: u64,
    /// Factor applied to the delay for each further retry.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Total attempts including the initial one.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// `min(backoff_ms * backoff_multiplier^(attempt - 1), max_backoff_ms)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let ceiling = self.max_backoff_ms as f64;
        let millis = if raw.is_finite() { raw.min(ceiling) } else { ceiling };
        Duration::from_millis(millis.max(0.0) as u64)
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.total_attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}
