//! Durable queue store with actor pattern
//!
//! QueueStore owns the queuestore backend and processes commands via
//! channels. Every operation is one message and one backend statement, so
//! each item is read or written atomically; nothing holds a live record
//! across an await point.

mod manager;
mod messages;

pub use manager::QueueStore;
pub use messages::{Collection, StoreCommand, StoreError, StoreResponse};
