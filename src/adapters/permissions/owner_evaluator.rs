//! Owner-only permission evaluator.
//!
//! A requester may delete a message they authored, or an assistant reply to
//! a message they authored. Replies written by any other user belong to that
//! user. Missing messages evaluate to `false` rather than an error.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, MessageId, Requester, UserId};
use crate::ports::{MessageStore, ObjectType, PermissionEvaluator};

/// Evaluates delete permission by authorship.
pub struct OwnerPermissionEvaluator {
    store: Arc<dyn MessageStore>,
    assistant_id: UserId,
}

impl OwnerPermissionEvaluator {
    /// Creates an evaluator reading authorship from the message store.
    /// `assistant_id` is the identity completions are written under.
    pub fn new(store: Arc<dyn MessageStore>, assistant_id: UserId) -> Self {
        Self {
            store,
            assistant_id,
        }
    }

    async fn owns_message(&self, id: &MessageId, requester: &Requester) -> Result<bool, DomainError> {
        let Some(message) = self.store.get_by_id(id).await? else {
            return Ok(false);
        };
        if message.author_id == requester.user_id {
            return Ok(true);
        }
        if message.author_id != self.assistant_id {
            return Ok(false);
        }
        match message.parent_id {
            Some(parent_id) => Ok(self
                .store
                .get_by_id(&parent_id)
                .await?
                .map(|parent| parent.author_id == requester.user_id)
                .unwrap_or(false)),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PermissionEvaluator for OwnerPermissionEvaluator {
    async fn can_delete(
        &self,
        object_type: ObjectType,
        ids: &[MessageId],
        requester: &Requester,
    ) -> Result<Vec<bool>, DomainError> {
        match object_type {
            ObjectType::ChatMessage => {
                let mut decisions = Vec::with_capacity(ids.len());
                for id in ids {
                    decisions.push(self.owns_message(id, requester).await?);
                }
                Ok(decisions)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryMessageStore;
    use crate::domain::chat::NewMessage;
    use crate::domain::foundation::{ChatId, UserId};

    fn assistant() -> UserId {
        UserId::new("assistant").unwrap()
    }

    fn evaluator(store: Arc<InMemoryMessageStore>) -> OwnerPermissionEvaluator {
        OwnerPermissionEvaluator::new(store, assistant())
    }

    #[tokio::test]
    async fn author_may_delete_own_turn_and_assistant_replies_to_it() {
        let store = Arc::new(InMemoryMessageStore::new());
        let owner = UserId::new("owner").unwrap();
        let other = UserId::new("other").unwrap();
        let chat_id = ChatId::new();

        let mine = store
            .append(NewMessage::new(chat_id, owner.clone(), None, "mine"))
            .await
            .unwrap();
        let answer = store
            .append(NewMessage::new(chat_id, assistant(), Some(mine.id), "answer"))
            .await
            .unwrap();
        let reply = store
            .append(NewMessage::new(chat_id, other.clone(), Some(mine.id), "reply"))
            .await
            .unwrap();
        let theirs = store
            .append(NewMessage::new(chat_id, other.clone(), None, "theirs"))
            .await
            .unwrap();
        let reply_to_theirs = store
            .append(NewMessage::new(chat_id, owner.clone(), Some(theirs.id), "follow-up"))
            .await
            .unwrap();
        let nested = store
            .append(NewMessage::new(chat_id, assistant(), Some(reply_to_theirs.id), "nested"))
            .await
            .unwrap();

        let decisions = evaluator(store)
            .can_delete(
                ObjectType::ChatMessage,
                &[mine.id, answer.id, reply.id, theirs.id, nested.id, MessageId::new()],
                &Requester::standard(owner),
            )
            .await
            .unwrap();

        assert_eq!(decisions, vec![true, true, false, false, true, false]);
    }

    #[tokio::test]
    async fn human_reply_to_own_turn_belongs_to_its_author() {
        let store = Arc::new(InMemoryMessageStore::new());
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();
        let chat_id = ChatId::new();

        let question = store
            .append(NewMessage::new(chat_id, alice.clone(), None, "question"))
            .await
            .unwrap();
        let answer = store
            .append(NewMessage::new(chat_id, bob.clone(), Some(question.id), "answer"))
            .await
            .unwrap();
        let evaluator = evaluator(store);

        let for_alice = evaluator
            .can_delete(ObjectType::ChatMessage, &[answer.id], &Requester::standard(alice))
            .await
            .unwrap();
        let for_bob = evaluator
            .can_delete(ObjectType::ChatMessage, &[answer.id], &Requester::standard(bob))
            .await
            .unwrap();

        assert_eq!(for_alice, vec![false]);
        assert_eq!(for_bob, vec![true]);
    }

    #[tokio::test]
    async fn stranger_may_delete_nothing() {
        let store = Arc::new(InMemoryMessageStore::new());
        let owner = UserId::new("owner").unwrap();
        let chat_id = ChatId::new();
        let mine = store
            .append(NewMessage::new(chat_id, owner.clone(), None, "mine"))
            .await
            .unwrap();
        let reply = store
            .append(NewMessage::new(chat_id, assistant(), Some(mine.id), "reply"))
            .await
            .unwrap();

        let decisions = evaluator(store)
            .can_delete(
                ObjectType::ChatMessage,
                &[mine.id, reply.id],
                &Requester::standard(UserId::new("stranger").unwrap()),
            )
            .await
            .unwrap();

        assert_eq!(decisions, vec![false, false]);
    }
}
