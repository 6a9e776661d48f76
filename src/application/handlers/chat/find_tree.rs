//! FindTreeHandler - Query handler for bidirectional message windows.
//!
//! Resolves the anchor's sequence (or the chat's latest sequence), then
//! probes both directions with one extra row each to detect continuation.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::deadline::{within, DEFAULT_STORE_TIMEOUT};
use crate::domain::chat::{
    Message, SortDirection, TreeWindowRequest, TreeWindowResult, DEFAULT_TAKE,
};
use crate::domain::foundation::{ChatId, DomainError, ErrorCode, MessageId, ValidationError};
use crate::ports::{MessageStore, SequenceRange};

/// Query for a message window, as received from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct FindTreeQuery {
    pub chat_id: String,
    pub start_id: Option<String>,
    pub exclude_up: bool,
    pub exclude_down: bool,
    /// Page size per side; `None` uses the default.
    pub take: Option<u32>,
    pub sort: SortDirection,
}

impl FindTreeQuery {
    /// Window ending at the latest message of a chat.
    pub fn latest(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            ..Default::default()
        }
    }

    /// Window centered on `start_id`.
    pub fn anchored(chat_id: impl Into<String>, start_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            start_id: Some(start_id.into()),
            ..Default::default()
        }
    }

    pub fn with_take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    pub fn excluding(mut self, exclude_up: bool, exclude_down: bool) -> Self {
        self.exclude_up = exclude_up;
        self.exclude_down = exclude_down;
        self
    }

    pub fn sorted(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    fn into_request(self) -> Result<TreeWindowRequest, ValidationError> {
        let chat_id = ChatId::parse(&self.chat_id)?;
        let mut request = TreeWindowRequest::latest(chat_id)
            .with_take(self.take.unwrap_or(DEFAULT_TAKE))?
            .excluding(self.exclude_up, self.exclude_down)
            .sorted(self.sort);
        if let Some(start_id) = self.start_id.as_deref() {
            request = request.anchored_at(MessageId::parse(start_id)?);
        }
        Ok(request)
    }
}

/// Errors that can occur when resolving a window.
#[derive(Debug, Clone, Error)]
pub enum FindTreeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Message not found in chat: {0}")]
    NotFound(MessageId),

    #[error("Store timed out: {0}")]
    StoreTimeout(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl FindTreeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FindTreeError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            FindTreeError::NotFound(_) => ErrorCode::MessageNotFound,
            FindTreeError::StoreTimeout(_) => ErrorCode::StoreTimeout,
            FindTreeError::StoreError(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<ValidationError> for FindTreeError {
    fn from(err: ValidationError) -> Self {
        FindTreeError::InvalidArgument(err.to_string())
    }
}

impl From<DomainError> for FindTreeError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidArgument => FindTreeError::InvalidArgument(err.message),
            ErrorCode::StoreTimeout => FindTreeError::StoreTimeout(err.message),
            _ => FindTreeError::StoreError(err.to_string()),
        }
    }
}

/// Handler for message window queries.
pub struct FindTreeHandler {
    store: Arc<dyn MessageStore>,
    store_timeout: Duration,
}

impl FindTreeHandler {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Overrides the per-call store deadline.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub async fn handle(&self, query: FindTreeQuery) -> Result<TreeWindowResult, FindTreeError> {
        let request = query.into_request()?;

        let Some(anchor) = self.resolve_anchor(&request).await? else {
            return Ok(TreeWindowResult::empty());
        };

        let up = async {
            if request.exclude_up {
                Ok(vec![anchor.clone()])
            } else {
                self.fetch(&request, SequenceRange::up_to(anchor.sequence), SortDirection::Desc)
                    .await
            }
        };
        let down = async {
            if request.exclude_down {
                Ok(Vec::new())
            } else {
                self.fetch(&request, SequenceRange::after(anchor.sequence), SortDirection::Asc)
                    .await
            }
        };
        let (up_desc, down_asc) = tokio::try_join!(up, down)?;

        Ok(TreeWindowResult::assemble(
            up_desc,
            down_asc,
            request.take,
            request.sort,
        ))
    }

    /// The anchor message, or the latest one. `None` for an empty chat.
    async fn resolve_anchor(
        &self,
        request: &TreeWindowRequest,
    ) -> Result<Option<Message>, FindTreeError> {
        match request.start_id {
            Some(start_id) => {
                let message = within(self.store_timeout, "get_by_id", self.store.get_by_id(&start_id))
                    .await?
                    .filter(|m| m.chat_id == request.chat_id)
                    .ok_or(FindTreeError::NotFound(start_id))?;
                Ok(Some(message))
            }
            None => {
                let latest = within(
                    self.store_timeout,
                    "list_by_sequence_range",
                    self.store.list_by_sequence_range(
                        &request.chat_id,
                        SequenceRange::all(),
                        1,
                        SortDirection::Desc,
                    ),
                )
                .await?;
                Ok(latest.into_iter().next())
            }
        }
    }

    async fn fetch(
        &self,
        request: &TreeWindowRequest,
        range: SequenceRange,
        direction: SortDirection,
    ) -> Result<Vec<Message>, FindTreeError> {
        let page = within(
            self.store_timeout,
            "list_by_sequence_range",
            self.store.list_by_sequence_range(
                &request.chat_id,
                range,
                request.probe_limit(),
                direction,
            ),
        )
        .await?;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryMessageStore;
    use crate::domain::chat::NewMessage;
    use crate::domain::foundation::UserId;
    use crate::ports::WriteStep;
    use async_trait::async_trait;

    async fn seeded_chat(count: usize) -> (Arc<InMemoryMessageStore>, ChatId, Vec<Message>) {
        let store = Arc::new(InMemoryMessageStore::new());
        let chat_id = ChatId::new();
        let author = UserId::new("author").unwrap();
        let mut messages = Vec::new();
        let mut parent = None;
        for i in 0..count {
            let message = store
                .append(NewMessage::new(chat_id, author.clone(), parent, format!("m{}", i + 1)))
                .await
                .unwrap();
            parent = Some(message.id);
            messages.push(message);
        }
        (store, chat_id, messages)
    }

    fn sequences(result: &TreeWindowResult) -> Vec<i64> {
        result.messages.iter().map(|m| m.sequence).collect()
    }

    mod windows {
        use super::*;

        #[tokio::test]
        async fn anchored_window_takes_both_sides() {
            let (store, chat_id, messages) = seeded_chat(10).await;
            let handler = FindTreeHandler::new(store);

            let query = FindTreeQuery::anchored(chat_id.to_string(), messages[4].id.to_string())
                .with_take(2);
            let result = handler.handle(query).await.unwrap();

            assert_eq!(sequences(&result), vec![4, 5, 6, 7]);
            assert!(result.has_more_up);
            assert!(result.has_more_down);
        }

        #[tokio::test]
        async fn latest_window_ends_at_highest_sequence() {
            let (store, chat_id, _) = seeded_chat(10).await;
            let handler = FindTreeHandler::new(store);

            let result = handler
                .handle(FindTreeQuery::latest(chat_id.to_string()).with_take(3))
                .await
                .unwrap();

            assert_eq!(sequences(&result), vec![8, 9, 10]);
            assert!(result.has_more_up);
            assert!(!result.has_more_down);
        }

        #[tokio::test]
        async fn excluding_both_sides_returns_only_anchor() {
            let (store, chat_id, messages) = seeded_chat(10).await;
            let handler = FindTreeHandler::new(store);

            let query = FindTreeQuery::anchored(chat_id.to_string(), messages[4].id.to_string())
                .excluding(true, true);
            let result = handler.handle(query).await.unwrap();

            assert_eq!(sequences(&result), vec![5]);
            assert!(!result.has_more_up);
            assert!(!result.has_more_down);
        }

        #[tokio::test]
        async fn exclude_down_keeps_older_page() {
            let (store, chat_id, messages) = seeded_chat(10).await;
            let handler = FindTreeHandler::new(store);

            let query = FindTreeQuery::anchored(chat_id.to_string(), messages[4].id.to_string())
                .with_take(3)
                .excluding(false, true);
            let result = handler.handle(query).await.unwrap();

            assert_eq!(sequences(&result), vec![3, 4, 5]);
            assert!(result.has_more_up);
            assert!(!result.has_more_down);
        }

        #[tokio::test]
        async fn exact_page_reports_no_more() {
            let (store, chat_id, messages) = seeded_chat(5).await;
            let handler = FindTreeHandler::new(store);

            // Three at or above the anchor, two below: both pages exactly full.
            let query = FindTreeQuery::anchored(chat_id.to_string(), messages[2].id.to_string())
                .with_take(3);
            let result = handler.handle(query).await.unwrap();

            assert_eq!(sequences(&result), vec![1, 2, 3, 4, 5]);
            assert!(!result.has_more_up);
            assert!(!result.has_more_down);
        }

        #[tokio::test]
        async fn descending_sort_reverses_presentation_only() {
            let (store, chat_id, messages) = seeded_chat(10).await;
            let handler = FindTreeHandler::new(store);

            let query = FindTreeQuery::anchored(chat_id.to_string(), messages[4].id.to_string())
                .with_take(2)
                .sorted(SortDirection::Desc);
            let result = handler.handle(query).await.unwrap();

            assert_eq!(sequences(&result), vec![7, 6, 5, 4]);
            assert!(result.has_more_up);
            assert!(result.has_more_down);
        }

        #[tokio::test]
        async fn empty_chat_returns_empty_window() {
            let store = Arc::new(InMemoryMessageStore::new());
            let handler = FindTreeHandler::new(store);

            let result = handler
                .handle(FindTreeQuery::latest(ChatId::new().to_string()))
                .await
                .unwrap();

            assert!(result.messages.is_empty());
            assert!(!result.has_more_up);
            assert!(!result.has_more_down);
        }

        #[tokio::test]
        async fn sibling_versions_appear_in_sequence_order() {
            let (store, chat_id, messages) = seeded_chat(3).await;
            let regenerated = store
                .append(NewMessage::new(
                    chat_id,
                    UserId::new("assistant").unwrap(),
                    messages[2].parent_id,
                    "m3 v2",
                ))
                .await
                .unwrap();
            let handler = FindTreeHandler::new(store);

            let result = handler
                .handle(FindTreeQuery::latest(chat_id.to_string()))
                .await
                .unwrap();

            assert_eq!(sequences(&result), vec![1, 2, 3, 4]);
            assert_eq!(result.messages[3].id, regenerated.id);
            assert_eq!(result.messages[3].version_index, 1);
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn rejects_malformed_chat_id() {
            let handler = FindTreeHandler::new(Arc::new(InMemoryMessageStore::new()));

            let err = handler
                .handle(FindTreeQuery::latest("not-a-uuid"))
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }

        #[tokio::test]
        async fn rejects_missing_chat_id() {
            let handler = FindTreeHandler::new(Arc::new(InMemoryMessageStore::new()));

            let err = handler.handle(FindTreeQuery::latest("")).await.unwrap_err();
            assert!(matches!(err, FindTreeError::InvalidArgument(_)));
        }

        #[tokio::test]
        async fn rejects_take_out_of_range() {
            let (store, chat_id, _) = seeded_chat(1).await;
            let handler = FindTreeHandler::new(store);

            for take in [0, 101] {
                let err = handler
                    .handle(FindTreeQuery::latest(chat_id.to_string()).with_take(take))
                    .await
                    .unwrap_err();
                assert_eq!(err.code(), ErrorCode::InvalidArgument);
            }
        }

        #[tokio::test]
        async fn unknown_anchor_is_not_found() {
            let (store, chat_id, _) = seeded_chat(3).await;
            let handler = FindTreeHandler::new(store);

            let missing = MessageId::new();
            let err = handler
                .handle(FindTreeQuery::anchored(chat_id.to_string(), missing.to_string()))
                .await
                .unwrap_err();
            assert!(matches!(err, FindTreeError::NotFound(id) if id == missing));
            assert_eq!(err.code(), ErrorCode::MessageNotFound);
        }

        #[tokio::test]
        async fn anchor_from_another_chat_is_not_found() {
            let (store, _, messages) = seeded_chat(3).await;
            let handler = FindTreeHandler::new(store);

            let err = handler
                .handle(FindTreeQuery::anchored(
                    ChatId::new().to_string(),
                    messages[0].id.to_string(),
                ))
                .await
                .unwrap_err();
            assert!(matches!(err, FindTreeError::NotFound(_)));
        }

        struct StalledStore;

        #[async_trait]
        impl MessageStore for StalledStore {
            async fn get_by_id(&self, _id: &MessageId) -> Result<Option<Message>, DomainError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }

            async fn list_by_sequence_range(
                &self,
                _chat_id: &ChatId,
                _range: SequenceRange,
                _limit: u32,
                _direction: SortDirection,
            ) -> Result<Vec<Message>, DomainError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }

            async fn transact(&self, _steps: Vec<WriteStep>) -> Result<(), DomainError> {
                Ok(())
            }
        }

        #[tokio::test(start_paused = true)]
        async fn slow_store_times_out() {
            let handler = FindTreeHandler::new(Arc::new(StalledStore))
                .with_store_timeout(Duration::from_millis(100));

            let err = handler
                .handle(FindTreeQuery::latest(ChatId::new().to_string()))
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::StoreTimeout);
        }
    }
}
