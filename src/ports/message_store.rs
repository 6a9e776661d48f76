//! Message store port.
//!
//! Narrow accessor over the relational store: point lookup, ordered slices
//! by sequence, and transactional multi-step writes.
//!
//! # Design
//!
//! - **Sequence-addressed reads**: windows are fetched by sequence bounds so
//!   the result does not shift as new messages arrive.
//! - **Append-only versions**: a new version is an `InsertMessage` step
//!   sharing the original's parent; rows are never re-parented.
//! - **Atomic writes**: all steps of one `transact` call commit together or
//!   not at all, including the per-chat sequence counter bump.

use async_trait::async_trait;

use crate::domain::chat::{ContentUpdate, Message, NewMessage, SortDirection};
use crate::domain::foundation::{ChatId, DomainError, MessageId};

/// Inclusive sequence bounds for a slice query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl SequenceRange {
    /// Every message in the chat.
    pub fn all() -> Self {
        Self::default()
    }

    /// Messages with `sequence <= to`.
    pub fn up_to(to: i64) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Messages with `sequence > after`.
    pub fn after(after: i64) -> Self {
        Self {
            from: Some(after.saturating_add(1)),
            to: None,
        }
    }

    /// Whether `sequence` falls within the bounds.
    pub fn contains(&self, sequence: i64) -> bool {
        self.from.map_or(true, |from| sequence >= from) && self.to.map_or(true, |to| sequence <= to)
    }
}

/// One step of an atomic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStep {
    /// Append a message. The store assigns the next per-chat sequence and
    /// the next version index among siblings.
    InsertMessage(NewMessage),
    /// Replace the payload of an existing message.
    UpdateContent(ContentUpdate),
}

/// Port for message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetch a message by id.
    ///
    /// Returns `None` if not found.
    async fn get_by_id(&self, id: &MessageId) -> Result<Option<Message>, DomainError>;

    /// Fetch up to `limit` messages of a chat within `range`, ordered by
    /// sequence in `direction`.
    async fn list_by_sequence_range(
        &self,
        chat_id: &ChatId,
        range: SequenceRange,
        limit: u32,
        direction: SortDirection,
    ) -> Result<Vec<Message>, DomainError>;

    /// Apply all steps atomically.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if an inserted message's parent is missing, in
    ///   another chat, or the message itself
    /// - `MessageNotFound` if an updated message doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn transact(&self, steps: Vec<WriteStep>) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn MessageStore) {}
    }

    #[test]
    fn up_to_is_inclusive() {
        let range = SequenceRange::up_to(5);
        assert!(range.contains(5));
        assert!(range.contains(1));
        assert!(!range.contains(6));
    }

    #[test]
    fn after_is_exclusive() {
        let range = SequenceRange::after(5);
        assert!(!range.contains(5));
        assert!(range.contains(6));
    }

    #[test]
    fn all_contains_everything() {
        assert!(SequenceRange::all().contains(i64::MIN));
        assert!(SequenceRange::all().contains(i64::MAX));
    }
}
