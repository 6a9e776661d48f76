//! Chat command and query handlers.

mod deadline;
mod find_tree;
mod record_completion;
mod regenerate_response;

pub use deadline::DEFAULT_STORE_TIMEOUT;
pub use find_tree::{FindTreeError, FindTreeHandler, FindTreeQuery};
pub use record_completion::{
    RecordCompletionCommand, RecordCompletionError, RecordCompletionHandler,
};
pub use regenerate_response::{
    RegenerateResponseCommand, RegenerateResponseError, RegenerateResponseHandler,
    RegenerateResponseResult,
};
