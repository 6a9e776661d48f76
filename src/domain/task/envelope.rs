//! Task envelope - a complete, replayable unit of background work.
//!
//! Serializes to the wire shape consumed by the external worker pool:
//!
//! ```json
//! { "id", "type": "LLM_COMPLETION", "chatId", "messageId", "userId", "model",
//!   "taskContexts": [],
//!   "allocation": { "maxCredits", "maxDurationMs", "maxMemoryMB", "maxConcurrentSteps" },
//!   "options": { "priority", "timeout",
//!                "retryPolicy": { "maxRetries", "backoffMs", "backoffMultiplier", "maxBackoffMs" } } }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::RetryPolicy;
use crate::domain::foundation::{ChatId, MessageId, TaskId, UserId};

/// Kind of work an envelope describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    LlmCompletion,
}

impl TaskType {
    /// Wire name of the task type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::LlmCompletion => "LLM_COMPLETION",
        }
    }
}

/// Scheduling priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A reference to context the worker should load (a message, a file, a
/// routine). Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TaskContext {
    /// Creates a context reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }
}

/// Resource limits for one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub max_credits: u64,
    pub max_duration_ms: u64,
    #[serde(rename = "maxMemoryMB")]
    pub max_memory_mb: u64,
    pub max_concurrent_steps: u32,
}

/// Delivery options for one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    pub priority: Priority,
    /// Bound on a single worker attempt, in milliseconds.
    pub timeout: u64,
    pub retry_policy: RetryPolicy,
}

impl TaskOptions {
    /// Per-attempt timeout as a duration.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Self-contained description of a requested generation.
///
/// Owned by the dispatch queue from enqueue to terminal resolution; the
/// queue only ever holds it behind a shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnvelope {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub model: String,
    pub task_contexts: Vec<TaskContext>,
    pub allocation: Allocation,
    pub options: TaskOptions,
}

impl TaskEnvelope {
    /// Serializes the envelope to its wire form.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses an envelope from its wire form.
    pub fn from_wire(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
