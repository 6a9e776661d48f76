//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `MessageStore` - Message reads and atomic writes
//! - `PermissionEvaluator` - Per-object permission checks
//! - `TaskQueue` - Fire-and-return envelope submission
//! - `TaskWorker` - One delivery attempt of an envelope

mod message_store;
mod permission_evaluator;
mod task_queue;
mod task_worker;

pub use message_store::{MessageStore, SequenceRange, WriteStep};
pub use permission_evaluator::{ObjectType, PermissionEvaluator};
pub use task_queue::{QueueError, TaskQueue};
pub use task_worker::{TaskWorker, WorkerError};
