//! Bidirectional message windows around an anchor.
//!
//! The window is addressed by `sequence`, not by offset, so a client keeps
//! its reading position while new messages keep arriving below it.

use serde::{Deserialize, Serialize};

use super::Message;
use crate::domain::foundation::{ChatId, MessageId, ValidationError};

/// Default page size on each side of the anchor.
pub const DEFAULT_TAKE: u32 = 25;

/// Largest page size accepted on each side of the anchor.
pub const MAX_TAKE: u32 = 100;

/// Presentation order of the returned messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Validated window query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeWindowRequest {
    pub chat_id: ChatId,
    /// Anchor. `None` means the most recent message in the chat.
    pub start_id: Option<MessageId>,
    pub exclude_up: bool,
    pub exclude_down: bool,
    pub take: u32,
    pub sort: SortDirection,
}

impl TreeWindowRequest {
    /// Creates a request anchored at the latest message with default paging.
    pub fn latest(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            start_id: None,
            exclude_up: false,
            exclude_down: false,
            take: DEFAULT_TAKE,
            sort: SortDirection::Asc,
        }
    }

    /// Anchors the window at a specific message.
    pub fn anchored_at(mut self, start_id: MessageId) -> Self {
        self.start_id = Some(start_id);
        self
    }

    /// Sets the page size, validating the bounds.
    pub fn with_take(mut self, take: u32) -> Result<Self, ValidationError> {
        if take == 0 || take > MAX_TAKE {
            return Err(ValidationError::out_of_range(
                "take",
                1,
                MAX_TAKE as i64,
                take as i64,
            ));
        }
        self.take = take;
        Ok(self)
    }

    /// Sets the exclusion flags.
    pub fn excluding(mut self, exclude_up: bool, exclude_down: bool) -> Self {
        self.exclude_up = exclude_up;
        self.exclude_down = exclude_down;
        self
    }

    /// Sets the presentation order.
    pub fn sorted(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    /// Number of rows to fetch per side: one extra to detect more data.
    pub fn probe_limit(&self) -> u32 {
        self.take + 1
    }
}

/// A window of messages with continuation flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeWindowResult {
    pub messages: Vec<Message>,
    pub has_more_up: bool,
    pub has_more_down: bool,
}

impl TreeWindowResult {
    /// An empty window (chat has no messages).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merges the two probe pages into a window.
    ///
    /// `up_desc` holds the anchor and older rows, newest first; `down_asc`
    /// holds newer rows, oldest first. Each page may carry one row beyond
    /// `take`, which only signals continuation and is dropped.
    pub fn assemble(
        mut up_desc: Vec<Message>,
        mut down_asc: Vec<Message>,
        take: u32,
        sort: SortDirection,
    ) -> Self {
        let take = take as usize;

        let has_more_up = up_desc.len() > take;
        up_desc.truncate(take);

        let has_more_down = down_asc.len() > take;
        down_asc.truncate(take);

        let mut messages = up_desc;
        messages.reverse();
        messages.append(&mut down_asc);
        messages.sort_by_key(|m| m.sequence);
        messages.dedup_by_key(|m| m.sequence);

        if sort == SortDirection::Desc {
            messages.reverse();
        }

        Self {
            messages,
            has_more_up,
            has_more_down,
        }
    }

    /// Sequence numbers of the window, in returned order.
    pub fn sequences(&self) -> Vec<i64> {
        self.messages.iter().map(|m| m.sequence).collect()
    }
}
