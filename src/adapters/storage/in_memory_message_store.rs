//! In-memory message store for testing and development.
//!
//! `transact` applies the steps to a working copy under the write lock and
//! swaps it in only when every step succeeded, so partial writes are never
//! visible. Sequence assignment is serialized by the same lock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::chat::{ContentUpdate, Message, NewMessage, SortDirection};
use crate::domain::foundation::{ChatId, DomainError, ErrorCode, MessageId, Timestamp};
use crate::ports::{MessageStore, SequenceRange, WriteStep};

#[derive(Debug, Clone, Default)]
struct StoreState {
    messages: HashMap<MessageId, Message>,
    /// Last assigned sequence per chat.
    sequences: HashMap<ChatId, i64>,
}

impl StoreState {
    fn apply(&mut self, step: WriteStep) -> Result<(), DomainError> {
        match step {
            WriteStep::InsertMessage(new) => self.insert(new),
            WriteStep::UpdateContent(update) => self.update(update),
        }
    }

    fn insert(&mut self, new: NewMessage) -> Result<(), DomainError> {
        new.validate()?;

        if self.messages.contains_key(&new.id) {
            return Err(DomainError::invalid_argument(
                "id",
                format!("Message {} already exists", new.id),
            ));
        }

        if let Some(parent_id) = new.parent_id {
            match self.messages.get(&parent_id) {
                Some(parent) if parent.chat_id == new.chat_id => {}
                Some(_) => {
                    return Err(DomainError::invalid_argument(
                        "parent_id",
                        "Parent message belongs to another chat",
                    ))
                }
                None => {
                    return Err(DomainError::invalid_argument(
                        "parent_id",
                        format!("Parent message {} not found", parent_id),
                    ))
                }
            }
        }

        let version_index = self
            .messages
            .values()
            .filter(|m| m.chat_id == new.chat_id && m.parent_id == new.parent_id)
            .count() as i32;

        let counter = self.sequences.entry(new.chat_id).or_insert(0);
        *counter += 1;
        let sequence = *counter;

        let now = Timestamp::now();
        let message = Message {
            id: new.id,
            chat_id: new.chat_id,
            author_id: new.author_id,
            sequence,
            version_index,
            parent_id: new.parent_id,
            content: new.content,
            created_at: now,
            updated_at: now,
        };
        self.messages.insert(message.id, message);
        Ok(())
    }

    fn update(&mut self, update: ContentUpdate) -> Result<(), DomainError> {
        let message = self.messages.get_mut(&update.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::MessageNotFound,
                format!("Message {} not found", update.id),
            )
        })?;
        message.content = update.content;
        message.updated_at = Timestamp::now();
        Ok(())
    }
}

/// In-memory message store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Inserts one message and returns the stored row.
    pub async fn append(&self, new: NewMessage) -> Result<Message, DomainError> {
        let id = new.id;
        self.transact(vec![WriteStep::InsertMessage(new)]).await?;
        self.get_by_id(&id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, "Inserted message vanished")
        })
    }

    /// Total number of stored messages across all chats.
    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn get_by_id(&self, id: &MessageId) -> Result<Option<Message>, DomainError> {
        Ok(self.state.read().await.messages.get(id).cloned())
    }

    async fn list_by_sequence_range(
        &self,
        chat_id: &ChatId,
        range: SequenceRange,
        limit: u32,
        direction: SortDirection,
    ) -> Result<Vec<Message>, DomainError> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.chat_id == *chat_id && range.contains(m.sequence))
            .cloned()
            .collect();

        match direction {
            SortDirection::Asc => messages.sort_by_key(|m| m.sequence),
            SortDirection::Desc => messages.sort_by_key(|m| std::cmp::Reverse(m.sequence)),
        }
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn transact(&self, steps: Vec<WriteStep>) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let mut working = state.clone();
        for step in steps {
            working.apply(step)?;
        }
        *state = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn author() -> UserId {
        UserId::new("author").unwrap()
    }

    async fn seed(store: &InMemoryMessageStore, chat_id: ChatId, count: usize) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::new();
        for i in 0..count {
            let parent = out.last().map(|m| m.id);
            let msg = store
                .append(NewMessage::new(chat_id, author(), parent, format!("m{}", i)))
                .await
                .unwrap();
            out.push(msg);
        }
        out
    }

    mod inserts {
        use super::*;

        #[tokio::test]
        async fn assigns_strictly_increasing_sequences_per_chat() {
            let store = InMemoryMessageStore::new();
            let chat_a = ChatId::new();
            let chat_b = ChatId::new();

            let a = seed(&store, chat_a, 3).await;
            let b = seed(&store, chat_b, 2).await;

            assert_eq!(a.iter().map(|m| m.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
            assert_eq!(b.iter().map(|m| m.sequence).collect::<Vec<_>>(), vec![1, 2]);
        }

        #[tokio::test]
        async fn sibling_versions_get_next_version_index() {
            let store = InMemoryMessageStore::new();
            let chat_id = ChatId::new();
            let question = seed(&store, chat_id, 1).await.remove(0);

            let first = store
                .append(NewMessage::new(chat_id, author(), Some(question.id), "v0"))
                .await
                .unwrap();
            let second = store
                .append(NewMessage::new(chat_id, author(), Some(question.id), "v1"))
                .await
                .unwrap();

            assert_eq!(first.version_index, 0);
            assert_eq!(second.version_index, 1);
            assert!(second.sequence > first.sequence);
            assert_eq!(store.message_count().await, 3);
        }

        #[tokio::test]
        async fn rejects_parent_from_another_chat() {
            let store = InMemoryMessageStore::new();
            let other = seed(&store, ChatId::new(), 1).await.remove(0);

            let result = store
                .append(NewMessage::new(ChatId::new(), author(), Some(other.id), "x"))
                .await;

            assert_eq!(result.unwrap_err().code, ErrorCode::InvalidArgument);
        }

        #[tokio::test]
        async fn rejects_missing_parent() {
            let store = InMemoryMessageStore::new();
            let result = store
                .append(NewMessage::new(ChatId::new(), author(), Some(MessageId::new()), "x"))
                .await;
            assert_eq!(result.unwrap_err().code, ErrorCode::InvalidArgument);
        }
    }

    mod transactions {
        use super::*;

        #[tokio::test]
        async fn failed_step_rolls_back_earlier_steps() {
            let store = InMemoryMessageStore::new();
            let chat_id = ChatId::new();

            let result = store
                .transact(vec![
                    WriteStep::InsertMessage(NewMessage::new(chat_id, author(), None, "ok")),
                    WriteStep::UpdateContent(ContentUpdate {
                        id: MessageId::new(),
                        content: "missing".to_string(),
                    }),
                ])
                .await;

            assert_eq!(result.unwrap_err().code, ErrorCode::MessageNotFound);
            assert_eq!(store.message_count().await, 0);

            // The counter rolled back too.
            let next = store
                .append(NewMessage::new(chat_id, author(), None, "after"))
                .await
                .unwrap();
            assert_eq!(next.sequence, 1);
        }

        #[tokio::test]
        async fn update_content_keeps_sequence() {
            let store = InMemoryMessageStore::new();
            let msg = seed(&store, ChatId::new(), 1).await.remove(0);

            store
                .transact(vec![WriteStep::UpdateContent(ContentUpdate {
                    id: msg.id,
                    content: "final".to_string(),
                })])
                .await
                .unwrap();

            let stored = store.get_by_id(&msg.id).await.unwrap().unwrap();
            assert_eq!(stored.content, "final");
            assert_eq!(stored.sequence, msg.sequence);
        }
    }

    mod listing {
        use super::*;

        #[tokio::test]
        async fn lists_descending_with_upper_bound() {
            let store = InMemoryMessageStore::new();
            let chat_id = ChatId::new();
            seed(&store, chat_id, 10).await;

            let page = store
                .list_by_sequence_range(&chat_id, SequenceRange::up_to(5), 3, SortDirection::Desc)
                .await
                .unwrap();

            assert_eq!(page.iter().map(|m| m.sequence).collect::<Vec<_>>(), vec![5, 4, 3]);
        }

        #[tokio::test]
        async fn lists_ascending_after_bound() {
            let store = InMemoryMessageStore::new();
            let chat_id = ChatId::new();
            seed(&store, chat_id, 10).await;

            let page = store
                .list_by_sequence_range(&chat_id, SequenceRange::after(8), 5, SortDirection::Asc)
                .await
                .unwrap();

            assert_eq!(page.iter().map(|m| m.sequence).collect::<Vec<_>>(), vec![9, 10]);
        }

        #[tokio::test]
        async fn other_chats_are_invisible() {
            let store = InMemoryMessageStore::new();
            seed(&store, ChatId::new(), 3).await;

            let page = store
                .list_by_sequence_range(&ChatId::new(), SequenceRange::all(), 10, SortDirection::Asc)
                .await
                .unwrap();

            assert!(page.is_empty());
        }
    }
}
