//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod chat;

pub use chat::{
    FindTreeError, FindTreeHandler, FindTreeQuery, RecordCompletionCommand,
    RecordCompletionError, RecordCompletionHandler, RegenerateResponseCommand,
    RegenerateResponseError, RegenerateResponseHandler, RegenerateResponseResult,
    DEFAULT_STORE_TIMEOUT,
};
