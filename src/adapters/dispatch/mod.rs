//! Task dispatch adapters.
//!
//! - `DispatchQueue` / `Dispatcher` - In-process queue with retrying delivery
//! - `DispatchLedger` - Delivery state and terminal failures for operators

mod ledger;
mod queue;

pub use ledger::{DispatchError, DispatchLedger, DispatchStatus, TerminalFailure};
pub use queue::{DispatchQueue, DispatchQueueConfig, Dispatcher};
