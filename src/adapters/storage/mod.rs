//! In-process storage adapters.

mod in_memory_message_store;

pub use in_memory_message_store::InMemoryMessageStore;
