//! Chatline - version-threaded chat retrieval and response regeneration.
//!
//! Message history is an append-only log ordered by a per-chat `sequence`,
//! with sibling versions linked through `parent_id`. Clients page around an
//! anchor with [`application::FindTreeHandler`]; regenerating a response
//! hands a self-contained task envelope to a background worker pool via
//! [`application::RegenerateResponseHandler`].

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
