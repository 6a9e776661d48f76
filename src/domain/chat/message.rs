//! Message rows and write payloads.
//!
//! History is append-only: a regenerated or edited turn is a new row sharing
//! the original's `parent_id`, never an overwrite of the old row.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChatId, MessageId, Timestamp, UserId, ValidationError};

/// A single stored message (one version of one conversational turn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub author_id: UserId,
    /// Per-chat reading order. Unique and strictly increasing within a chat.
    pub sequence: i64,
    /// Position among siblings sharing `parent_id`.
    pub version_index: i32,
    pub parent_id: Option<MessageId>,
    /// Opaque payload.
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    /// True when both messages occupy the same logical slot.
    pub fn is_sibling_of(&self, other: &Message) -> bool {
        self.chat_id == other.chat_id && self.parent_id == other.parent_id && self.id != other.id
    }
}

/// A message to be appended. Sequence and version index are assigned by the
/// store inside the insert transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub author_id: UserId,
    pub parent_id: Option<MessageId>,
    pub content: String,
}

impl NewMessage {
    /// Creates a new message with a fresh id.
    pub fn new(
        chat_id: ChatId,
        author_id: UserId,
        parent_id: Option<MessageId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            chat_id,
            author_id,
            parent_id,
            content: content.into(),
        }
    }

    /// Rejects structurally invalid rows.
    ///
    /// A parent must already exist, so the only cycle a fresh row can form
    /// is pointing at itself; the store checks existence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.parent_id == Some(self.id) {
            return Err(ValidationError::invalid_format(
                "parent_id",
                "message cannot be its own parent",
            ));
        }
        Ok(())
    }
}

/// In-place change of an existing row's payload (e.g. finalizing a
/// placeholder). Never used to create a new version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub id: MessageId,
    pub content: String,
}
