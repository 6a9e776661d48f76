//! Redis adapters - broker handoff to the external worker pool.

mod task_worker;

pub use task_worker::RedisTaskWorker;
