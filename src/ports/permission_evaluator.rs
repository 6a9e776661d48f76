//! Permission evaluation port.
//!
//! The evaluator is fail-secure: implementations answer `false` for any id
//! they cannot resolve.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DomainError, MessageId, Requester};

/// Kind of object a permission is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    ChatMessage,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::ChatMessage => write!(f, "ChatMessage"),
        }
    }
}

/// Port for per-object permission checks.
#[async_trait]
pub trait PermissionEvaluator: Send + Sync {
    /// Whether `requester` may delete each object.
    ///
    /// The result has one entry per input id, in input order.
    async fn can_delete(
        &self,
        object_type: ObjectType,
        ids: &[MessageId],
        requester: &Requester,
    ) -> Result<Vec<bool>, DomainError>;
}
