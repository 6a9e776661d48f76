//! RecordCompletion command handler.
//!
//! Write-back path for a finished generation: the result is appended as a
//! new sibling version of the regenerated message. The old row stays put.
//! Sequence is assigned at write time, so when two regenerations of the same
//! message finish out of order the later completion reads as newest.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::deadline::{within, DEFAULT_STORE_TIMEOUT};
use crate::domain::chat::{Message, NewMessage};
use crate::domain::foundation::{DomainError, ErrorCode, MessageId, TaskId, UserId};
use crate::domain::task::TaskEnvelope;
use crate::ports::{MessageStore, WriteStep};

/// Command carrying a finished generation.
#[derive(Debug, Clone)]
pub struct RecordCompletionCommand {
    pub task_id: TaskId,
    /// The message the envelope regenerated.
    pub message_id: MessageId,
    /// Identity the new version is authored by (the assistant).
    pub author_id: UserId,
    pub content: String,
}

impl RecordCompletionCommand {
    /// Completion for the message targeted by `envelope`.
    pub fn for_envelope(
        envelope: &TaskEnvelope,
        author_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            task_id: envelope.id,
            message_id: envelope.message_id,
            author_id,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RecordCompletionError {
    #[error("Regenerated message not found: {0}")]
    NotFound(MessageId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store timed out: {0}")]
    StoreTimeout(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl RecordCompletionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RecordCompletionError::NotFound(_) => ErrorCode::MessageNotFound,
            RecordCompletionError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            RecordCompletionError::StoreTimeout(_) => ErrorCode::StoreTimeout,
            RecordCompletionError::StoreError(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for RecordCompletionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidArgument => RecordCompletionError::InvalidArgument(err.message),
            ErrorCode::StoreTimeout => RecordCompletionError::StoreTimeout(err.message),
            _ => RecordCompletionError::StoreError(err.to_string()),
        }
    }
}

/// Handler that persists a completed generation as a new version.
pub struct RecordCompletionHandler {
    store: Arc<dyn MessageStore>,
    store_timeout: Duration,
}

impl RecordCompletionHandler {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Appends the new version and returns the stored row.
    pub async fn handle(&self, cmd: RecordCompletionCommand) -> Result<Message, RecordCompletionError> {
        let target = within(self.store_timeout, "get_by_id", self.store.get_by_id(&cmd.message_id))
            .await?
            .ok_or(RecordCompletionError::NotFound(cmd.message_id))?;

        let version = NewMessage::new(target.chat_id, cmd.author_id, target.parent_id, cmd.content);
        let version_id = version.id;

        within(
            self.store_timeout,
            "transact",
            self.store.transact(vec![WriteStep::InsertMessage(version)]),
        )
        .await?;

        let stored = within(self.store_timeout, "get_by_id", self.store.get_by_id(&version_id))
            .await?
            .ok_or_else(|| {
                RecordCompletionError::StoreError(format!("Version {} missing after insert", version_id))
            })?;

        tracing::info!(
            task_id = %cmd.task_id,
            chat_id = %stored.chat_id,
            message_id = %stored.id,
            version_index = stored.version_index,
            "Completion recorded"
        );

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryMessageStore;
    use crate::domain::chat::{SortDirection, VersionGroups};
    use crate::domain::foundation::ChatId;
    use crate::ports::SequenceRange;

    fn assistant() -> UserId {
        UserId::new("assistant").unwrap()
    }

    async fn conversation() -> (Arc<InMemoryMessageStore>, Message, Message) {
        let store = Arc::new(InMemoryMessageStore::new());
        let chat_id = ChatId::new();
        let prompt = store
            .append(NewMessage::new(chat_id, UserId::new("user").unwrap(), None, "question"))
            .await
            .unwrap();
        let answer = store
            .append(NewMessage::new(chat_id, assistant(), Some(prompt.id), "answer v1"))
            .await
            .unwrap();
        (store, prompt, answer)
    }

    fn command(message_id: MessageId, content: &str) -> RecordCompletionCommand {
        RecordCompletionCommand {
            task_id: TaskId::new(),
            message_id,
            author_id: assistant(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn appends_sibling_version() {
        let (store, prompt, answer) = conversation().await;
        let handler = RecordCompletionHandler::new(store.clone());

        let stored = handler.handle(command(answer.id, "answer v2")).await.unwrap();

        assert_eq!(stored.chat_id, answer.chat_id);
        assert_eq!(stored.parent_id, Some(prompt.id));
        assert_eq!(stored.version_index, 1);
        assert_eq!(stored.sequence, 3);
        assert!(stored.is_sibling_of(&answer));

        // The original row is untouched.
        let original = store.get_by_id(&answer.id).await.unwrap().unwrap();
        assert_eq!(original.content, "answer v1");
        assert_eq!(store.message_count().await, 3);
    }

    #[tokio::test]
    async fn later_completion_is_latest_version() {
        let (store, prompt, answer) = conversation().await;
        let handler = RecordCompletionHandler::new(store.clone());

        let first = handler.handle(command(answer.id, "v2")).await.unwrap();
        // Regenerating the newer version still lands in the same slot.
        let second = handler.handle(command(first.id, "v3")).await.unwrap();

        assert_eq!(second.version_index, 2);
        assert!(second.sequence > first.sequence);

        let all = store
            .list_by_sequence_range(&answer.chat_id, SequenceRange::all(), 100, SortDirection::Asc)
            .await
            .unwrap();
        let groups = VersionGroups::from_messages(&all);
        assert_eq!(groups.versions_of(Some(prompt.id)).len(), 3);
        assert_eq!(groups.latest_in_slot(Some(prompt.id)).map(|m| m.id), Some(second.id));
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let handler = RecordCompletionHandler::new(Arc::new(InMemoryMessageStore::new()));

        let missing = MessageId::new();
        let err = handler.handle(command(missing, "v2")).await.unwrap_err();

        assert!(matches!(err, RecordCompletionError::NotFound(id) if id == missing));
        assert_eq!(err.code(), ErrorCode::MessageNotFound);
    }
}
