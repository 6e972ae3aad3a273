//! Domain types for syncqueue
//!
//! The two queued entity kinds, QueuedRequest and SyncRecord, plus the
//! small enums they carry. Both implement the queuestore Record trait and
//! are persisted in their own collection.

mod category;
mod id;
mod priority;
mod request;
mod sync_record;

pub use category::{Category, RecordType};
pub use id::generate_id;
pub use priority::Priority;
pub use request::{HttpMethod, QueuedRequest, RequestTarget};
pub use sync_record::SyncRecord;

// Re-export queuestore types for convenience
pub use queuestore::{Record, now_ms};
