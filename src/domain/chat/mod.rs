//! Chat module - messages, version threading, and tree windows.

mod message;
mod tree_window;
mod versions;

pub use message::{ContentUpdate, Message, NewMessage};
pub use tree_window::{
    SortDirection, TreeWindowRequest, TreeWindowResult, DEFAULT_TAKE, MAX_TAKE,
};
pub use versions::VersionGroups;
