//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `storage` - In-memory message store
//! - `postgres` - PostgreSQL message store
//! - `permissions` - Owner-based permission evaluator
//! - `dispatch` - In-process dispatch queue with retrying delivery
//! - `redis` - Broker handoff to the external worker pool

pub mod dispatch;
pub mod permissions;
pub mod postgres;
pub mod redis;
pub mod storage;

pub use dispatch::{
    DispatchError, DispatchLedger, DispatchQueue, DispatchQueueConfig, DispatchStatus,
    Dispatcher, TerminalFailure,
};
pub use permissions::OwnerPermissionEvaluator;
pub use postgres::PostgresMessageStore;
pub use redis::RedisTaskWorker;
pub use storage::InMemoryMessageStore;
