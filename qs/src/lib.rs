//! QueueStore - durable per-item record store
//!
//! A small persistence layer for offline queues. Records are grouped into
//! named collections and stored as JSON documents in a single SQLite table,
//! so every create/update/delete is atomic for one record and the whole
//! store survives process restarts.
//!
//! # Architecture
//!
//! ```text
//! queue.db
//! └── records
//!     ├── (collection, id)  primary key
//!     ├── data              JSON document
//!     └── updated_at        unix ms
//! ```
//!
//! # Example
//!
//! ```ignore
//! use queuestore::{Record, Store};
//!
//! let mut store = Store::open("queue.db")?;
//! store.create(item)?;
//! let pending: Vec<Item> = store.list()?;
//! ```

pub mod cli;
mod error;
mod record;
mod store;

pub use error::{StoreError, StoreResult};
pub use record::{Record, now_ms};
pub use store::Store;

/// Default database file name inside a store directory
pub const DEFAULT_DB_NAME: &str = "queue.db";
