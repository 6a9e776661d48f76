//! Chatline service entry point.
//!
//! Composition root only: wires the PostgreSQL message store, the Redis
//! worker bridge and the in-process dispatcher into [`ChatServices`], logs
//! dispatcher health, and runs until ctrl-c. Request transports live in
//! their own crates and take the same `ChatServices`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use chatline::adapters::postgres;
use chatline::adapters::{
    DispatchLedger, DispatchQueue, OwnerPermissionEvaluator, PostgresMessageStore,
    RedisTaskWorker,
};
use chatline::application::ChatServices;
use chatline::config::AppConfig;
use chatline::domain::task::EnvelopeBuilder;
use chatline::ports::{MessageStore, TaskQueue};
use chatline::telemetry;

const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.logging)?;

    let pool = postgres::connect(&config.database).await?;
    let store: Arc<dyn MessageStore> = Arc::new(PostgresMessageStore::new(pool));

    let worker = Arc::new(RedisTaskWorker::from_config(&config.redis)?);
    let ledger = Arc::new(DispatchLedger::with_delivered_retention(
        config.dispatch.delivered_retention,
    ));
    let (queue, dispatcher) =
        DispatchQueue::new(config.dispatch.queue_config(), worker, Arc::clone(&ledger));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatch_task = tokio::spawn(dispatcher.run(shutdown_rx));

    let queue: Arc<dyn TaskQueue> = Arc::new(queue);
    let permissions = Arc::new(OwnerPermissionEvaluator::new(
        Arc::clone(&store),
        config.dispatch.assistant_id()?,
    ));
    let services = ChatServices::new(
        Arc::clone(&store),
        permissions,
        queue,
        EnvelopeBuilder::new(config.dispatch.policy()),
        config.dispatch.store_timeout(),
    );

    tracing::info!(
        queue_capacity = config.dispatch.queue_capacity,
        max_retries = config.dispatch.max_retries,
        "Chatline started"
    );

    let shutdown_signal = tokio::signal::ctrl_c();
    tokio::pin!(shutdown_signal);
    let mut health = tokio::time::interval(HEALTH_INTERVAL);
    health.tick().await;
    loop {
        tokio::select! {
            signal = &mut shutdown_signal => {
                signal?;
                break;
            }
            _ = health.tick() => {
                tracing::info!(
                    pending = ledger.pending_count().await,
                    tracked = ledger.tracked_count().await,
                    terminal_failures = ledger.terminal_failures().await.len(),
                    "Dispatcher health"
                );
            }
        }
    }
    tracing::info!("Shutdown signal received, draining dispatcher");

    // No further submissions once the handlers are gone.
    drop(services);

    let _ = shutdown_tx.send(true);
    dispatch_task.await?;

    let failures = ledger.terminal_failures().await;
    if !failures.is_empty() {
        tracing::error!(count = failures.len(), "Tasks exhausted retries during this run");
    }
    tracing::info!("Chatline stopped");

    Ok(())
}
