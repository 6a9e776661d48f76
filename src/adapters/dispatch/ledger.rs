//! Dispatch ledger - per-task delivery state for operator inspection.
//!
//! The envelope itself is immutable once enqueued; the attempt counter and
//! status tracked here are the only things that change.
//!
//! Delivered tasks are kept for a bounded window, oldest evicted first.
//! Terminal failures are never evicted.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::foundation::{ChatId, ErrorCode, MessageId, TaskId, Timestamp};
use crate::domain::task::{TaskEnvelope, TaskType};

/// Errors produced inside the dispatch loop. Never surfaced to the caller
/// that submitted the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// One attempt failed or timed out; drives backoff.
    #[error("Attempt {attempt} failed: {reason}")]
    WorkerAttemptFailed { attempt: u32, reason: String },

    /// Retries exhausted.
    #[error("Task {task_id} failed after {attempts} attempts: {last_error}")]
    TerminalDispatchFailure {
        task_id: TaskId,
        attempts: u32,
        last_error: String,
    },
}

impl DispatchError {
    /// Maps to the shared error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::WorkerAttemptFailed { .. } => ErrorCode::WorkerAttemptFailed,
            DispatchError::TerminalDispatchFailure { .. } => ErrorCode::TerminalDispatchFailure,
        }
    }
}

/// Delivery state of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchStatus {
    Queued,
    InFlight { attempt: u32 },
    RetryScheduled { attempt: u32, delay_ms: u64 },
    Delivered { attempts: u32 },
    Failed { attempts: u32 },
}

impl DispatchStatus {
    /// Whether the task reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Delivered { .. } | DispatchStatus::Failed { .. }
        )
    }
}

/// A task that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalFailure {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: Timestamp,
}

impl TerminalFailure {
    /// Records exhaustion of `envelope` after `attempts` attempts.
    pub fn new(envelope: &TaskEnvelope, attempts: u32, last_error: impl Into<String>) -> Self {
        Self {
            task_id: envelope.id,
            task_type: envelope.task_type,
            chat_id: envelope.chat_id,
            message_id: envelope.message_id,
            attempts,
            last_error: last_error.into(),
            failed_at: Timestamp::now(),
        }
    }

    /// The failure as a dispatch error.
    pub fn to_error(&self) -> DispatchError {
        DispatchError::TerminalDispatchFailure {
            task_id: self.task_id,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
        }
    }
}

/// Delivered tasks kept by [`DispatchLedger::new`].
pub const DEFAULT_DELIVERED_RETENTION: usize = 1024;

#[derive(Debug, Default)]
struct LedgerState {
    statuses: HashMap<TaskId, DispatchStatus>,
    attempts: HashMap<TaskId, u32>,
    delivered: VecDeque<TaskId>,
    failures: Vec<TerminalFailure>,
}

/// Shared delivery state for all tasks of one dispatcher.
#[derive(Debug)]
pub struct DispatchLedger {
    state: RwLock<LedgerState>,
    delivered_retention: usize,
}

impl Default for DispatchLedger {
    fn default() -> Self {
        Self::with_delivered_retention(DEFAULT_DELIVERED_RETENTION)
    }
}

impl DispatchLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger keeping at most `retention` delivered tasks.
    pub fn with_delivered_retention(retention: usize) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            delivered_retention: retention,
        }
    }

    pub(crate) async fn record_queued(&self, task_id: TaskId) {
        let mut state = self.state.write().await;
        state.statuses.insert(task_id, DispatchStatus::Queued);
        state.attempts.insert(task_id, 0);
    }

    pub(crate) async fn record_attempt(&self, task_id: TaskId, attempt: u32) {
        let mut state = self.state.write().await;
        state
            .statuses
            .insert(task_id, DispatchStatus::InFlight { attempt });
        state.attempts.insert(task_id, attempt);
    }

    pub(crate) async fn record_retry(&self, task_id: TaskId, attempt: u32, delay: Duration) {
        self.state.write().await.statuses.insert(
            task_id,
            DispatchStatus::RetryScheduled {
                attempt,
                delay_ms: delay.as_millis() as u64,
            },
        );
    }

    pub(crate) async fn record_delivered(&self, task_id: TaskId, attempts: u32) {
        let mut state = self.state.write().await;
        state
            .statuses
            .insert(task_id, DispatchStatus::Delivered { attempts });
        state.delivered.push_back(task_id);

        while state.delivered.len() > self.delivered_retention {
            let Some(evicted) = state.delivered.pop_front() else {
                break;
            };
            state.statuses.remove(&evicted);
            state.attempts.remove(&evicted);
        }
    }

    pub(crate) async fn record_failure(&self, failure: TerminalFailure) {
        let mut state = self.state.write().await;
        state.statuses.insert(
            failure.task_id,
            DispatchStatus::Failed {
                attempts: failure.attempts,
            },
        );
        state.failures.push(failure);
    }

    /// Current status of a task, if it was ever accepted.
    pub async fn status(&self, task_id: &TaskId) -> Option<DispatchStatus> {
        self.state.read().await.statuses.get(task_id).cloned()
    }

    /// Attempts made so far for a task.
    pub async fn attempts(&self, task_id: &TaskId) -> u32 {
        self.state
            .read()
            .await
            .attempts
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    /// Every task that exhausted its retries, oldest first.
    pub async fn terminal_failures(&self) -> Vec<TerminalFailure> {
        self.state.read().await.failures.clone()
    }

    /// Number of tasks the ledger currently holds, in any state.
    pub async fn tracked_count(&self) -> usize {
        self.state.read().await.statuses.len()
    }

    /// Number of tasks not yet in a terminal state.
    pub async fn pending_count(&self) -> usize {
        self.state
            .read()
            .await
            .statuses
            .values()
            .filter(|s| !s.is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_attempt_counter_through_lifecycle() {
        let ledger = DispatchLedger::new();
        let id = TaskId::new();

        ledger.record_queued(id).await;
        assert_eq!(ledger.status(&id).await, Some(DispatchStatus::Queued));
        assert_eq!(ledger.pending_count().await, 1);

        ledger.record_attempt(id, 1).await;
        ledger.record_retry(id, 1, Duration::from_millis(250)).await;
        assert_eq!(
            ledger.status(&id).await,
            Some(DispatchStatus::RetryScheduled {
                attempt: 1,
                delay_ms: 250
            })
        );

        ledger.record_attempt(id, 2).await;
        ledger.record_delivered(id, 2).await;
        assert_eq!(ledger.attempts(&id).await, 2);
        assert!(ledger.status(&id).await.unwrap().is_terminal());
        assert_eq!(ledger.pending_count().await, 0);
    }

    #[tokio::test]
    async fn evicts_oldest_delivered_beyond_retention() {
        let ledger = DispatchLedger::with_delivered_retention(2);
        let ids: Vec<TaskId> = (0..3).map(|_| TaskId::new()).collect();

        for id in &ids {
            ledger.record_queued(*id).await;
            ledger.record_attempt(*id, 1).await;
            ledger.record_delivered(*id, 1).await;
        }

        assert!(ledger.status(&ids[0]).await.is_none());
        assert_eq!(ledger.attempts(&ids[0]).await, 0);
        assert_eq!(
            ledger.status(&ids[2]).await,
            Some(DispatchStatus::Delivered { attempts: 1 })
        );
        assert_eq!(ledger.tracked_count().await, 2);
    }

    #[tokio::test]
    async fn failures_survive_delivered_eviction() {
        let ledger = DispatchLedger::with_delivered_retention(0);
        let failed = TaskId::new();
        let delivered = TaskId::new();

        ledger.record_queued(failed).await;
        ledger
            .record_failure(TerminalFailure {
                task_id: failed,
                task_type: TaskType::LlmCompletion,
                chat_id: ChatId::new(),
                message_id: MessageId::new(),
                attempts: 4,
                last_error: "boom".to_string(),
                failed_at: Timestamp::now(),
            })
            .await;
        ledger.record_queued(delivered).await;
        ledger.record_delivered(delivered, 1).await;

        assert!(ledger.status(&delivered).await.is_none());
        assert_eq!(
            ledger.status(&failed).await,
            Some(DispatchStatus::Failed { attempts: 4 })
        );
        assert_eq!(ledger.terminal_failures().await.len(), 1);
    }

    #[test]
    fn dispatch_errors_map_to_codes() {
        let attempt = DispatchError::WorkerAttemptFailed {
            attempt: 1,
            reason: "boom".to_string(),
        };
        assert_eq!(attempt.code(), ErrorCode::WorkerAttemptFailed);

        let terminal = DispatchError::TerminalDispatchFailure {
            task_id: TaskId::new(),
            attempts: 4,
            last_error: "boom".to_string(),
        };
        assert_eq!(terminal.code(), ErrorCode::TerminalDispatchFailure);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(DispatchStatus::Failed { attempts: 4 }).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["attempts"], 4);
    }
}
