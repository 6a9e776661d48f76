//! RegenerateResponse command handler.
//!
//! Schedules a new version of an existing message. The handler's job ends
//! once the envelope is accepted by the queue; the regenerated version shows
//! up in the message tree when the worker writes it back.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use super::deadline::{within, DEFAULT_STORE_TIMEOUT};
use crate::domain::foundation::{
    ChatId, DomainError, ErrorCode, MessageId, Requester, TaskId, ValidationError,
};
use crate::domain::task::{EnvelopeBuilder, TaskContext};
use crate::ports::{MessageStore, ObjectType, PermissionEvaluator, QueueError, TaskQueue};

/// Command to regenerate a message.
#[derive(Debug, Clone)]
pub struct RegenerateResponseCommand {
    /// The message to supersede, as received from the caller.
    pub message_id: String,
    /// Free-form model selector passed through to the worker.
    pub model: String,
    /// Context references for the worker, in order.
    pub task_contexts: Vec<TaskContext>,
}

impl RegenerateResponseCommand {
    pub fn new(message_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            model: model.into(),
            task_contexts: Vec::new(),
        }
    }

    pub fn with_contexts(mut self, task_contexts: Vec<TaskContext>) -> Self {
        self.task_contexts = task_contexts;
        self
    }
}

/// Errors that can occur when regenerating a message.
#[derive(Debug, Clone, Error)]
pub enum RegenerateResponseError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthorized: requester may not regenerate message {0}")]
    Unauthorized(MessageId),

    #[error("Message not found: {0}")]
    NotFound(MessageId),

    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Store timed out: {0}")]
    StoreTimeout(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl RegenerateResponseError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegenerateResponseError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            RegenerateResponseError::Unauthorized(_) => ErrorCode::Unauthorized,
            RegenerateResponseError::NotFound(_) => ErrorCode::MessageNotFound,
            RegenerateResponseError::QueueUnavailable(_) => ErrorCode::QueueUnavailable,
            RegenerateResponseError::StoreTimeout(_) => ErrorCode::StoreTimeout,
            RegenerateResponseError::StoreError(_) => ErrorCode::DatabaseError,
        }
    }

    /// Whether the caller may safely repeat the same call.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<ValidationError> for RegenerateResponseError {
    fn from(err: ValidationError) -> Self {
        RegenerateResponseError::InvalidArgument(err.to_string())
    }
}

impl From<DomainError> for RegenerateResponseError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidArgument => RegenerateResponseError::InvalidArgument(err.message),
            ErrorCode::StoreTimeout => RegenerateResponseError::StoreTimeout(err.message),
            ErrorCode::QueueUnavailable => RegenerateResponseError::QueueUnavailable(err.message),
            _ => RegenerateResponseError::StoreError(err.to_string()),
        }
    }
}

impl From<QueueError> for RegenerateResponseError {
    fn from(err: QueueError) -> Self {
        RegenerateResponseError::QueueUnavailable(err.to_string())
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateResponseResult {
    /// Envelope id, for correlating the eventual completion.
    pub task_id: TaskId,
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Handler for RegenerateResponse commands.
pub struct RegenerateResponseHandler {
    store: Arc<dyn MessageStore>,
    permissions: Arc<dyn PermissionEvaluator>,
    queue: Arc<dyn TaskQueue>,
    builder: EnvelopeBuilder,
    store_timeout: Duration,
}

impl RegenerateResponseHandler {
    pub fn new(
        store: Arc<dyn MessageStore>,
        permissions: Arc<dyn PermissionEvaluator>,
        queue: Arc<dyn TaskQueue>,
        builder: EnvelopeBuilder,
    ) -> Self {
        Self {
            store,
            permissions,
            queue,
            builder,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Overrides the deadline for each store, permission and queue call.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub async fn handle(
        &self,
        cmd: RegenerateResponseCommand,
        requester: &Requester,
    ) -> Result<RegenerateResponseResult, RegenerateResponseError> {
        let message_id = MessageId::parse(&cmd.message_id)?;
        if cmd.model.trim().is_empty() {
            return Err(ValidationError::empty_field("model").into());
        }

        // Regeneration supersedes the message the way deletion would.
        let decisions = within(
            self.store_timeout,
            "can_delete",
            self.permissions
                .can_delete(ObjectType::ChatMessage, &[message_id], requester),
        )
        .await?;
        if !decisions.first().copied().unwrap_or(false) {
            tracing::warn!(
                message_id = %message_id,
                user_id = %requester.user_id,
                "Regeneration denied"
            );
            return Err(RegenerateResponseError::Unauthorized(message_id));
        }

        let message = within(self.store_timeout, "get_by_id", self.store.get_by_id(&message_id))
            .await?
            .ok_or(RegenerateResponseError::NotFound(message_id))?;

        let envelope = self.builder.build(
            &cmd.message_id,
            message.chat_id,
            requester,
            &cmd.model,
            cmd.task_contexts,
        )?;
        let task_id = envelope.id;

        match time::timeout(self.store_timeout, self.queue.add_task(envelope)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RegenerateResponseError::QueueUnavailable(format!(
                    "enqueue exceeded {}ms",
                    self.store_timeout.as_millis()
                )))
            }
        }

        tracing::info!(
            task_id = %task_id,
            chat_id = %message.chat_id,
            message_id = %message_id,
            "Regeneration scheduled"
        );

        Ok(RegenerateResponseResult {
            task_id,
            chat_id: message.chat_id,
            message_id,
        })
    }
}
