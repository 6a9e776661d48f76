//! In-process dispatch queue with retrying delivery.
//!
//! [`DispatchQueue`] is the submit side: a bounded channel whose `add_task`
//! returns as soon as the envelope is accepted. [`Dispatcher`] is the
//! delivery side: it runs one attempt chain per envelope, each attempt
//! bounded by the envelope's timeout, with exponential backoff between
//! attempts. Chains are independent, so a failing envelope never delays
//! another, and there is no ordering guarantee across envelopes.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `capacity` | 1024 | Envelopes buffered before `add_task` waits |
//! | `enqueue_timeout` | 2s | Longest `add_task` waits for buffer space |
//! | `max_concurrent_attempts` | 16 | Attempts executing at once |
//!
//! ## Graceful Shutdown
//!
//! On shutdown the dispatcher stops reading new submissions, starts chains
//! for envelopes already buffered, and waits for every chain to settle.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time;

use super::ledger::{DispatchError, DispatchLedger, TerminalFailure};
use crate::domain::task::TaskEnvelope;
use crate::ports::{QueueError, TaskQueue, TaskWorker};

/// Configuration for the dispatch queue.
#[derive(Debug, Clone)]
pub struct DispatchQueueConfig {
    /// Envelopes buffered between submit and delivery.
    pub capacity: usize,

    /// Longest a submit waits for buffer space.
    pub enqueue_timeout: Duration,

    /// Attempts allowed to execute concurrently.
    pub max_concurrent_attempts: usize,
}

impl Default for DispatchQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            enqueue_timeout: Duration::from_secs(2),
            max_concurrent_attempts: 16,
        }
    }
}

impl DispatchQueueConfig {
    /// Create config with custom capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Create config with custom enqueue timeout.
    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Create config with custom attempt concurrency.
    pub fn with_max_concurrent_attempts(mut self, max: usize) -> Self {
        self.max_concurrent_attempts = max.max(1);
        self
    }
}

/// Submit side of the dispatcher.
#[derive(Clone)]
pub struct DispatchQueue {
    sender: mpsc::Sender<Arc<TaskEnvelope>>,
    ledger: Arc<DispatchLedger>,
    enqueue_timeout: Duration,
}

impl DispatchQueue {
    /// Creates a connected queue and dispatcher.
    pub fn new(
        config: DispatchQueueConfig,
        worker: Arc<dyn TaskWorker>,
        ledger: Arc<DispatchLedger>,
    ) -> (Self, Dispatcher) {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let queue = Self {
            sender,
            ledger: Arc::clone(&ledger),
            enqueue_timeout: config.enqueue_timeout,
        };
        let dispatcher = Dispatcher {
            receiver,
            worker,
            ledger,
            permits: Arc::new(Semaphore::new(config.max_concurrent_attempts.max(1))),
        };
        (queue, dispatcher)
    }

    /// The ledger shared with the dispatcher.
    pub fn ledger(&self) -> Arc<DispatchLedger> {
        Arc::clone(&self.ledger)
    }
}

#[async_trait]
impl TaskQueue for DispatchQueue {
    async fn add_task(&self, envelope: TaskEnvelope) -> Result<(), QueueError> {
        let task_id = envelope.id;

        // Nothing touches the ledger until a slot is held, so a caller that
        // gives up while waiting leaves no trace.
        let permit = match time::timeout(self.enqueue_timeout, self.sender.reserve()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                tracing::warn!(task_id = %task_id, "Dispatch queue closed");
                return Err(QueueError::Closed);
            }
            Err(_) => {
                tracing::warn!(task_id = %task_id, "Dispatch queue full");
                return Err(QueueError::Unavailable(format!(
                    "no capacity within {}ms",
                    self.enqueue_timeout.as_millis()
                )));
            }
        };

        // Recorded before the send so the dispatcher's first update wins.
        self.ledger.record_queued(task_id).await;
        permit.send(Arc::new(envelope));

        tracing::debug!(task_id = %task_id, "Task enqueued");
        Ok(())
    }
}

/// Delivery side of the dispatcher.
pub struct Dispatcher {
    receiver: mpsc::Receiver<Arc<TaskEnvelope>>,
    worker: Arc<dyn TaskWorker>,
    ledger: Arc<DispatchLedger>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    /// Run the delivery loop until shutdown is signalled or every queue
    /// handle is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut chains = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                next = self.receiver.recv() => match next {
                    Some(envelope) => {
                        chains.spawn(self.chain(envelope));
                    }
                    None => break,
                },

                Some(joined) = chains.join_next(), if !chains.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Delivery chain panicked");
                    }
                }
            }
        }

        self.receiver.close();
        while let Ok(envelope) = self.receiver.try_recv() {
            chains.spawn(self.chain(envelope));
        }

        tracing::info!(in_flight = chains.len(), "Dispatcher draining");
        while let Some(joined) = chains.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Delivery chain panicked");
            }
        }
        tracing::info!("Dispatcher stopped");
    }

    fn chain(&self, envelope: Arc<TaskEnvelope>) -> impl std::future::Future<Output = ()> + Send + 'static {
        deliver(
            envelope,
            Arc::clone(&self.worker),
            Arc::clone(&self.ledger),
            Arc::clone(&self.permits),
        )
    }
}

/// One envelope's attempt chain: attempt, back off, repeat until delivered or
/// out of retries.
async fn deliver(
    envelope: Arc<TaskEnvelope>,
    worker: Arc<dyn TaskWorker>,
    ledger: Arc<DispatchLedger>,
    permits: Arc<Semaphore>,
) {
    let policy = envelope.options.retry_policy;
    let mut attempt = 0;

    loop {
        attempt += 1;
        ledger.record_attempt(envelope.id, attempt).await;

        match run_attempt(&envelope, worker.as_ref(), &permits, attempt).await {
            Ok(()) => {
                ledger.record_delivered(envelope.id, attempt).await;
                tracing::info!(
                    task_id = %envelope.id,
                    chat_id = %envelope.chat_id,
                    message_id = %envelope.message_id,
                    attempts = attempt,
                    "Task delivered"
                );
                return;
            }
            Err(err) => {
                tracing::warn!(
                    task_id = %envelope.id,
                    chat_id = %envelope.chat_id,
                    attempt,
                    error = %err,
                    "Task attempt failed"
                );

                if !policy.allows_another(attempt) {
                    let reason = match &err {
                        DispatchError::WorkerAttemptFailed { reason, .. } => reason.clone(),
                        other => other.to_string(),
                    };
                    let failure = TerminalFailure::new(&envelope, attempt, reason);
                    tracing::error!(
                        task_id = %envelope.id,
                        chat_id = %envelope.chat_id,
                        message_id = %envelope.message_id,
                        attempts = attempt,
                        error = %failure.to_error(),
                        "Task dispatch failed permanently"
                    );
                    ledger.record_failure(failure).await;
                    return;
                }

                let delay = policy.delay_for_attempt(attempt);
                ledger.record_retry(envelope.id, attempt, delay).await;
                tracing::debug!(
                    task_id = %envelope.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Task retry scheduled"
                );
                time::sleep(delay).await;
            }
        }
    }
}

async fn run_attempt(
    envelope: &TaskEnvelope,
    worker: &dyn TaskWorker,
    permits: &Semaphore,
    attempt: u32,
) -> Result<(), DispatchError> {
    let _permit = permits
        .acquire()
        .await
        .map_err(|_| DispatchError::WorkerAttemptFailed {
            attempt,
            reason: "dispatcher closed".to_string(),
        })?;

    let timeout = envelope.options.attempt_timeout();
    match time::timeout(timeout, worker.execute(envelope, attempt)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DispatchError::WorkerAttemptFailed {
            attempt,
            reason: e.to_string(),
        }),
        Err(_) => Err(DispatchError::WorkerAttemptFailed {
            attempt,
            reason: format!("timed out after {}ms", timeout.as_millis()),
        }),
    }
}
