//! Handler bundle for the transport layer.
//!
//! A transport crate (HTTP, GraphQL, a worker callback endpoint) takes one
//! [`ChatServices`] and routes requests to its handlers. All handlers share
//! the same store and store deadline.

use std::sync::Arc;
use std::time::Duration;

use super::handlers::{FindTreeHandler, RecordCompletionHandler, RegenerateResponseHandler};
use crate::domain::task::EnvelopeBuilder;
use crate::ports::{MessageStore, PermissionEvaluator, TaskQueue};

/// The chat handlers wired against one set of adapters.
pub struct ChatServices {
    pub find_tree: FindTreeHandler,
    pub regenerate: RegenerateResponseHandler,
    pub record_completion: RecordCompletionHandler,
}

impl ChatServices {
    pub fn new(
        store: Arc<dyn MessageStore>,
        permissions: Arc<dyn PermissionEvaluator>,
        queue: Arc<dyn TaskQueue>,
        builder: EnvelopeBuilder,
        store_timeout: Duration,
    ) -> Self {
        Self {
            find_tree: FindTreeHandler::new(Arc::clone(&store)).with_store_timeout(store_timeout),
            regenerate: RegenerateResponseHandler::new(
                Arc::clone(&store),
                permissions,
                queue,
                builder,
            )
            .with_store_timeout(store_timeout),
            record_completion: RecordCompletionHandler::new(store).with_store_timeout(store_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dispatch::{DispatchLedger, DispatchQueue, DispatchQueueConfig};
    use crate::adapters::permissions::OwnerPermissionEvaluator;
    use crate::adapters::storage::InMemoryMessageStore;
    use crate::application::{FindTreeQuery, RegenerateResponseCommand};
    use crate::domain::chat::NewMessage;
    use crate::domain::foundation::{ChatId, Requester, UserId};
    use crate::domain::task::TaskEnvelope;
    use crate::ports::{TaskWorker, WorkerError};
    use async_trait::async_trait;

    struct IdleWorker;

    #[async_trait]
    impl TaskWorker for IdleWorker {
        async fn execute(&self, _envelope: &TaskEnvelope, _attempt: u32) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_share_one_store() {
        let store = Arc::new(InMemoryMessageStore::new());
        let user = UserId::new("user").unwrap();
        let assistant = UserId::new("assistant").unwrap();
        let chat_id = ChatId::new();
        let prompt = store
            .append(NewMessage::new(chat_id, user.clone(), None, "question"))
            .await
            .unwrap();
        let answer = store
            .append(NewMessage::new(chat_id, assistant.clone(), Some(prompt.id), "answer"))
            .await
            .unwrap();

        let ledger = Arc::new(DispatchLedger::new());
        let (queue, _dispatcher) =
            DispatchQueue::new(DispatchQueueConfig::default(), Arc::new(IdleWorker), Arc::clone(&ledger));
        let services = ChatServices::new(
            store.clone(),
            Arc::new(OwnerPermissionEvaluator::new(store.clone(), assistant)),
            Arc::new(queue),
            EnvelopeBuilder::default(),
            Duration::from_secs(1),
        );

        let window = services
            .find_tree
            .handle(FindTreeQuery::latest(chat_id.to_string()))
            .await
            .unwrap();
        assert_eq!(window.messages.len(), 2);

        let submitted = services
            .regenerate
            .handle(
                RegenerateResponseCommand::new(answer.id.to_string(), "model"),
                &Requester::standard(user),
            )
            .await
            .unwrap();
        assert_eq!(submitted.chat_id, chat_id);
        assert_eq!(ledger.pending_count().await, 1);
    }
}
