//! Task worker port - one delivery attempt of an envelope.
//!
//! The dispatcher calls `execute` once per attempt and bounds each call with
//! the envelope's timeout; workers do not implement their own retries.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::task::TaskEnvelope;

/// Outcome of a failed attempt as reported by the worker.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The attempt failed and may succeed on retry.
    #[error("Worker attempt failed: {0}")]
    Failed(String),

    /// The worker refused the envelope (e.g. unknown model). Still counted
    /// as an attempt so the retry budget bounds it.
    #[error("Worker rejected task: {0}")]
    Rejected(String),
}

/// Port for executing one attempt of a task.
#[async_trait]
pub trait TaskWorker: Send + Sync {
    /// Run one attempt. `attempt` is 1-based.
    async fn execute(&self, envelope: &TaskEnvelope, attempt: u32) -> Result<(), WorkerError>;
}
