//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;
pub mod services;

pub use handlers::{
    // Query handlers
    FindTreeError, FindTreeHandler, FindTreeQuery,
    // Command handlers
    RecordCompletionCommand, RecordCompletionError, RecordCompletionHandler,
    RegenerateResponseCommand, RegenerateResponseError, RegenerateResponseHandler,
    RegenerateResponseResult,
};
pub use services::ChatServices;
