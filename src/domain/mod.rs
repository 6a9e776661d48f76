//! Domain layer - message threading, tree windows, and task envelopes.
//!
//! Pure types and rules with no I/O. Ports in [`crate::ports`] describe the
//! storage and dispatch seams these types flow through.

pub mod chat;
pub mod foundation;
pub mod task;
