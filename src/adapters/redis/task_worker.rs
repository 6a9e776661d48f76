//! Redis-backed task worker for the external generation pool.
//!
//! Each attempt is a request/reply over Redis lists:
//! 1. RPUSH the envelope (plus attempt number and reply key) onto the task
//!    list for its priority tier
//! 2. BLPOP the per-attempt reply key until a worker answers or the attempt
//!    timeout elapses
//!
//! The pool drains `high` before `medium` before `low`. A missing reply
//! counts as a failed attempt; the dispatcher owns retries.
//!
//! Reply contract: the pool RPUSHes `{"ok": bool, "error"?: string}` onto
//! `replyTo` and then sets `EXPIRE replyTo replyTtlSecs`, so replies that
//! arrive after the attempt gave up do not outlive the TTL. When no reply
//! arrives the bridge also deletes the key itself.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time;

use crate::config::RedisConfig;
use crate::domain::foundation::TaskId;
use crate::domain::task::{Priority, TaskEnvelope};
use crate::ports::{TaskWorker, WorkerError};

/// Message pushed onto the task list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrokerMessage<'a> {
    #[serde(flatten)]
    envelope: &'a TaskEnvelope,
    attempt: u32,
    reply_to: String,
    reply_ttl_secs: u64,
}

/// Reply written by the external worker.
#[derive(Debug, Deserialize)]
struct WorkerReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Hands envelopes to the external worker pool through Redis.
#[derive(Clone)]
pub struct RedisTaskWorker {
    client: redis::Client,
    key_prefix: String,
    connect_timeout: Duration,
    reply_ttl: Duration,
}

impl RedisTaskWorker {
    /// Create a worker bridge for the given Redis client.
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            connect_timeout: Duration::from_secs(5),
            reply_ttl: Duration::from_secs(300),
        }
    }

    /// Create a worker bridge from configuration.
    pub fn from_config(config: &RedisConfig) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(config.url.as_str())?;
        Ok(Self::new(client, config.key_prefix.clone())
            .with_connect_timeout(config.timeout())
            .with_reply_ttl(config.reply_ttl()))
    }

    /// Bound on opening the broker connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Lifetime the pool is asked to give each reply key.
    pub fn with_reply_ttl(mut self, ttl: Duration) -> Self {
        self.reply_ttl = ttl;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Task list for a priority tier.
    pub fn task_list_key(&self, priority: Priority) -> String {
        let tier = match priority {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        format!("{}:tasks:{}", self.key_prefix, tier)
    }

    /// Reply key for one attempt of a task.
    pub fn reply_key(&self, task_id: &TaskId, attempt: u32) -> String {
        format!("{}:replies:{}:{}", self.key_prefix, task_id, attempt)
    }
}

fn encode_message(
    envelope: &TaskEnvelope,
    attempt: u32,
    reply_to: String,
    reply_ttl: Duration,
) -> Result<String, WorkerError> {
    serde_json::to_string(&BrokerMessage {
        envelope,
        attempt,
        reply_to,
        reply_ttl_secs: reply_ttl.as_secs().max(1),
    })
    .map_err(|e| WorkerError::Rejected(format!("Failed to encode envelope: {}", e)))
}

fn decode_reply(raw: &str) -> Result<(), WorkerError> {
    let reply: WorkerReply = serde_json::from_str(raw)
        .map_err(|e| WorkerError::Failed(format!("Malformed worker reply: {}", e)))?;
    if reply.ok {
        Ok(())
    } else {
        Err(WorkerError::Failed(
            reply.error.unwrap_or_else(|| "worker reported failure".to_string()),
        ))
    }
}

/// BLPOP takes whole seconds; round up so the dispatcher's own timeout is
/// the one that fires first.
fn blpop_timeout_secs(timeout_ms: u64) -> u64 {
    timeout_ms.div_ceil(1_000).max(1)
}

#[async_trait]
impl TaskWorker for RedisTaskWorker {
    async fn execute(&self, envelope: &TaskEnvelope, attempt: u32) -> Result<(), WorkerError> {
        let reply_key = self.reply_key(&envelope.id, attempt);
        let payload = encode_message(envelope, attempt, reply_key.clone(), self.reply_ttl)?;

        let mut conn = time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_tokio_connection(),
        )
        .await
        .map_err(|_| {
            WorkerError::Failed(format!(
                "Broker connect timed out after {}ms",
                self.connect_timeout.as_millis()
            ))
        })?
        .map_err(|e| WorkerError::Failed(format!("Broker unreachable: {}", e)))?;

        conn.rpush::<_, _, ()>(self.task_list_key(envelope.options.priority), payload)
            .await
            .map_err(|e: redis::RedisError| WorkerError::Failed(format!("Failed to push task: {}", e)))?;

        tracing::debug!(task_id = %envelope.id, attempt, "Task handed to worker pool");

        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&reply_key)
            .arg(blpop_timeout_secs(envelope.options.timeout))
            .query_async(&mut conn)
            .await
            .map_err(|e| WorkerError::Failed(format!("Failed to await reply: {}", e)))?;

        match reply {
            Some((_, body)) => decode_reply(&body),
            None => {
                if let Err(e) = conn.del::<_, ()>(&reply_key).await {
                    tracing::warn!(task_id = %envelope.id, attempt, error = %e, "Failed to clear reply key");
                }
                Err(WorkerError::Failed("no reply from worker pool".to_string()))
            }
        }
    }
}

impl std::fmt::Debug for RedisTaskWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTaskWorker")
            .field("key_prefix", &self.key_prefix)
            .field("connect_timeout", &self.connect_timeout)
            .field("reply_ttl", &self.reply_ttl)
            .finish_non_exhaustive()
    }
}
