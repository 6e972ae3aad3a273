//! SyncRecord domain type
//!
//! A domain record waiting to be delivered to its record-type endpoint.
//! Unlike QueuedRequest there is no attempt ceiling: a record stays until
//! it is marked synced and later swept, or the collection is cleared.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use queuestore::{Record, now_ms};

use super::category::RecordType;
use super::id::generate_id;
use super::priority::Priority;

/// Payload key holding the client-side sync stamp
pub const SYNCED_AT_KEY: &str = "syncedAt";

/// A pending domain record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Unique identifier
    pub id: String,

    /// Domain record plus the client-stamped `syncedAt`
    pub payload: Value,

    pub record_type: RecordType,

    pub priority: Priority,

    /// Enqueue timestamp (Unix milliseconds)
    pub enqueued_at: i64,

    pub synced: bool,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl SyncRecord {
    /// Create a new record, stamping `syncedAt` into the payload
    ///
    /// Object payloads get the stamp merged in; any other JSON value is
    /// wrapped as `{"data": <value>, "syncedAt": ...}`.
    pub fn new(payload: Value, record_type: RecordType, priority: Priority) -> Self {
        let now = now_ms();
        Self {
            id: generate_id("sync"),
            payload: stamp_synced_at(payload),
            record_type,
            priority,
            enqueued_at: now,
            synced: false,
            updated_at: now,
        }
    }

    /// Mark as delivered
    pub fn mark_synced(&mut self) {
        self.synced = true;
        self.updated_at = now_ms();
    }

    /// The stamped `syncedAt` value, if present
    pub fn synced_at(&self) -> Option<&str> {
        self.payload.get(SYNCED_AT_KEY).and_then(Value::as_str)
    }
}

fn stamp_synced_at(payload: Value) -> Value {
    let stamp = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    match payload {
        Value::Object(mut map) => {
            map.insert(SYNCED_AT_KEY.to_string(), stamp);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map.insert(SYNCED_AT_KEY.to_string(), stamp);
            Value::Object(map)
        }
    }
}

impl Record for SyncRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "sync_data"
    }
}
