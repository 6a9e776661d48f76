//! Task queue port - fire-and-return submission of envelopes.
//!
//! `add_task` returns once the envelope has been accepted. Delivery,
//! retries, and terminal failure happen behind the port and are never
//! reported back to the submitter.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::task::TaskEnvelope;

/// Errors raised when submitting work.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The broker cannot accept work right now. Safe to retry.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// The queue has shut down and will not accept work again.
    #[error("Queue closed")]
    Closed,
}

impl From<QueueError> for DomainError {
    fn from(err: QueueError) -> Self {
        DomainError::new(ErrorCode::QueueUnavailable, err.to_string())
    }
}

/// Port for submitting task envelopes.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Accept an envelope for eventual delivery to a worker.
    ///
    /// Does not wait for the work itself.
    async fn add_task(&self, envelope: TaskEnvelope) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_queue_is_object_safe() {
        fn _accepts_dyn(_queue: &dyn TaskQueue) {}
    }

    #[test]
    fn queue_errors_map_to_queue_unavailable() {
        let err: DomainError = QueueError::Closed.into();
        assert_eq!(err.code, ErrorCode::QueueUnavailable);
        assert!(err.code.is_retryable());
    }
}
