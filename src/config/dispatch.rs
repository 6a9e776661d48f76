//! Dispatch configuration
//!
//! Queue sizing, store deadlines and the per-tier allocation policy stamped
//! into every envelope.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::dispatch::DispatchQueueConfig;
use crate::domain::foundation::UserId;
use crate::domain::task::{DispatchPolicy, RetryPolicy};

/// Dispatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Envelopes buffered between submit and delivery
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Longest a submit waits for buffer space, in milliseconds
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,

    /// Attempts executing concurrently
    #[serde(default = "default_max_concurrent_attempts")]
    pub max_concurrent_attempts: usize,

    /// Delivered tasks kept in the ledger for inspection
    #[serde(default = "default_delivered_retention")]
    pub delivered_retention: usize,

    /// Identity completions are written under
    #[serde(default = "default_assistant_user_id")]
    pub assistant_user_id: String,

    /// Deadline for a single store read, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Credit ceiling on the standard plan
    #[serde(default = "default_standard_max_credits")]
    pub standard_max_credits: u64,

    /// Credit ceiling on the premium plan
    #[serde(default = "default_premium_max_credits")]
    pub premium_max_credits: u64,

    /// Wall-clock ceiling for one generation, in milliseconds
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Memory ceiling for one generation, in megabytes
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,

    /// Deadline for one delivery attempt, in milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Retries after the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Factor applied to the delay for each further retry
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on any single delay, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl DispatchConfig {
    /// Get store read deadline as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Identity completions are written under
    pub fn assistant_id(&self) -> Result<UserId, crate::domain::foundation::ValidationError> {
        UserId::new(self.assistant_user_id.trim())
    }

    /// Retry policy stamped into envelopes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_ms: self.backoff_ms,
            backoff_multiplier: self.backoff_multiplier,
            max_backoff_ms: self.max_backoff_ms,
        }
    }

    /// Allocation policy for the envelope builder
    pub fn policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            standard_max_credits: self.standard_max_credits,
            premium_max_credits: self.premium_max_credits,
            max_duration_ms: self.max_duration_ms,
            max_memory_mb: self.max_memory_mb,
            attempt_timeout_ms: self.attempt_timeout_ms,
            retry_policy: self.retry_policy(),
        }
    }

    /// Queue settings for the in-process dispatcher
    pub fn queue_config(&self) -> DispatchQueueConfig {
        DispatchQueueConfig::default()
            .with_capacity(self.queue_capacity)
            .with_enqueue_timeout(Duration::from_millis(self.enqueue_timeout_ms))
            .with_max_concurrent_attempts(self.max_concurrent_attempts)
    }

    /// Validate dispatch configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.queue_capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        if self.assistant_user_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DISPATCH_ASSISTANT_USER_ID"));
        }
        if self.enqueue_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("enqueue_timeout_ms"));
        }
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("store_timeout_ms"));
        }
        if self.attempt_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("attempt_timeout_ms"));
        }
        if self.premium_max_credits < self.standard_max_credits {
            return Err(ValidationError::InvalidCreditTiers);
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ValidationError::InvalidBackoffMultiplier);
        }
        if self.backoff_ms > self.max_backoff_ms {
            return Err(ValidationError::BackoffExceedsCeiling);
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            max_concurrent_attempts: default_max_concurrent_attempts(),
            delivered_retention: default_delivered_retention(),
            assistant_user_id: default_assistant_user_id(),
            store_timeout_ms: default_store_timeout_ms(),
            standard_max_credits: default_standard_max_credits(),
            premium_max_credits: default_premium_max_credits(),
            max_duration_ms: default_max_duration_ms(),
            max_memory_mb: default_max_memory_mb(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_enqueue_timeout_ms() -> u64 {
    2_000
}

fn default_max_concurrent_attempts() -> usize {
    16
}

fn default_delivered_retention() -> usize {
    1024
}

fn default_assistant_user_id() -> String {
    "assistant".to_string()
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_standard_max_credits() -> u64 {
    500
}

fn default_premium_max_credits() -> u64 {
    5_000
}

fn default_max_duration_ms() -> u64 {
    300_000
}

fn default_max_memory_mb() -> u64 {
    512
}

fn default_attempt_timeout_ms() -> u64 {
    120_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    30_000
}
