//! Envelope construction from a generation request.
//!
//! Every field is resolved here, synchronously, from the requester's plan
//! and the configured [`DispatchPolicy`]. Nothing is late-bound, so a built
//! envelope can be replayed as-is.

use super::{
    Allocation, Priority, RetryPolicy, TaskContext, TaskEnvelope, TaskOptions, TaskType,
};
use crate::domain::foundation::{ChatId, MessageId, Requester, TaskId, ValidationError};

/// Business constants for envelope allocation, injected from config.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPolicy {
    pub standard_max_credits: u64,
    pub premium_max_credits: u64,
    pub max_duration_ms: u64,
    pub max_memory_mb: u64,
    pub attempt_timeout_ms: u64,
    pub retry_policy: RetryPolicy,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            standard_max_credits: 500,
            premium_max_credits: 5_000,
            max_duration_ms: 300_000,
            max_memory_mb: 512,
            attempt_timeout_ms: 120_000,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl DispatchPolicy {
    /// Credit ceiling for the requester's plan.
    pub fn credits_for(&self, requester: &Requester) -> u64 {
        if requester.premium {
            self.premium_max_credits
        } else {
            self.standard_max_credits
        }
    }

    /// Priority tier for the requester's plan.
    pub fn priority_for(&self, requester: &Requester) -> Priority {
        if requester.premium {
            Priority::High
        } else {
            Priority::Medium
        }
    }
}

/// Builds LLM completion envelopes.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder {
    policy: DispatchPolicy,
}

impl EnvelopeBuilder {
    /// A single generation is never internally parallelized.
    pub const MAX_CONCURRENT_STEPS: u32 = 1;

    /// Creates a builder for the given policy.
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy in use.
    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Builds an envelope for regenerating `message_id` in `chat_id`.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` / `EmptyField` if `message_id` is not a UUID or the
    /// model selector is blank.
    pub fn build(
        &self,
        message_id: &str,
        chat_id: ChatId,
        requester: &Requester,
        model: &str,
        task_contexts: Vec<TaskContext>,
    ) -> Result<TaskEnvelope, ValidationError> {
        let message_id = MessageId::parse(message_id)?;
        let model = model.trim();
        if model.is_empty() {
            return Err(ValidationError::empty_field("model"));
        }

        Ok(TaskEnvelope {
            id: TaskId::new(),
            task_type: TaskType::LlmCompletion,
            chat_id,
            message_id,
            user_id: requester.user_id.clone(),
            model: model.to_string(),
            task_contexts,
            allocation: Allocation {
                max_credits: self.policy.credits_for(requester),
                max_duration_ms: self.policy.max_duration_ms,
                max_memory_mb: self.policy.max_memory_mb,
                max_concurrent_steps: Self::MAX_CONCURRENT_STEPS,
            },
            options: TaskOptions {
                priority: self.policy.priority_for(requester),
                timeout: self.policy.attempt_timeout_ms,
                retry_policy: self.policy.retry_policy,
            },
        })
    }
}
