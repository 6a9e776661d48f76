//! Task module - envelopes handed to the background worker pool.

mod builder;
mod envelope;
mod retry_policy;

pub use builder::{DispatchPolicy, EnvelopeBuilder};
pub use envelope::{Allocation, Priority, TaskContext, TaskEnvelope, TaskOptions, TaskType};
pub use retry_policy::RetryPolicy;
