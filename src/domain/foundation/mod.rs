//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the requester context, and error types
//! that form the vocabulary of the chatline domain.

mod errors;
mod ids;
mod requester;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ChatId, MessageId, TaskId, UserId};
pub use requester::Requester;
pub use timestamp::Timestamp;
