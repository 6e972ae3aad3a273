//! Telemetry event types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Category, Priority, RecordType};

/// What caused a drain pass to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// Host reported the network became reachable
    Connectivity,
    /// Foreground periodic timer tick
    Periodic,
    /// Explicit `trigger_sync` call
    Manual,
    /// Opportunistic drain after an enqueue
    Enqueue,
    /// Host background agent woke the application
    Background,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connectivity => write!(f, "connectivity"),
            Self::Periodic => write!(f, "periodic"),
            Self::Manual => write!(f, "manual"),
            Self::Enqueue => write!(f, "enqueue"),
            Self::Background => write!(f, "background"),
        }
    }
}

/// Every transition the engine reports to its telemetry sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    // === Background registration ===
    Registered {
        tags: Vec<String>,
    },

    RegistrationFailed {
        tag: String,
        error: String,
    },

    Triggered {
        source: TriggerSource,
    },

    // === Request queue ===
    RequestQueued {
        id: String,
        category: Category,
        priority: Priority,
    },

    RequestSynced {
        id: String,
        category: Category,
        method: String,
    },

    RequestFailed {
        id: String,
        category: Category,
        attempts: u32,
        max_attempts: u32,
        error: String,
    },

    /// Attempt ceiling reached; the request is gone for good
    RequestDropped {
        id: String,
        category: Category,
        method: String,
        attempts: u32,
    },

    // === Sync data ===
    DataQueued {
        id: String,
        record_type: RecordType,
        priority: Priority,
    },

    DataSynced {
        id: String,
        record_type: RecordType,
    },

    DataFailed {
        id: String,
        record_type: RecordType,
        error: String,
    },

    // === Maintenance ===
    Cleared {
        collection: String,
        removed: usize,
    },

    Purged {
        removed: usize,
    },

    ConfigUpdated {
        periodic: bool,
        interval_ms: u64,
    },

    ConnectivityChanged {
        online: bool,
    },
}

impl SyncEvent {
    /// Telemetry name of this event
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::RegistrationFailed { .. } => "registration_failed",
            Self::Triggered { .. } => "triggered",
            Self::RequestQueued { .. } => "request_queued",
            Self::RequestSynced { .. } => "item_synced",
            Self::RequestFailed { .. } => "item_failed",
            Self::RequestDropped { .. } => "item_dropped",
            Self::DataQueued { .. } => "data_queued",
            Self::DataSynced { .. } => "data_synced",
            Self::DataFailed { .. } => "data_failed",
            Self::Cleared { .. } => "cleared",
            Self::Purged { .. } => "purged",
            Self::ConfigUpdated { .. } => "config_updated",
            Self::ConnectivityChanged { .. } => "connectivity_changed",
        }
    }

    /// Small flat property map for the telemetry sink
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        let mut put = |k: &str, v: String| {
            props.insert(k.to_string(), v);
        };
        match self {
            Self::Registered { tags } => {
                put("tags", tags.join(","));
            }
            Self::RegistrationFailed { tag, error } => {
                put("tag", tag.clone());
                put("error", error.clone());
            }
            Self::Triggered { source } => {
                put("source", source.to_string());
            }
            Self::RequestQueued { id, category, priority } => {
                put("id", id.clone());
                put("category", category.to_string());
                put("priority", priority.to_string());
            }
            Self::RequestSynced { id, category, method } => {
                put("id", id.clone());
                put("category", category.to_string());
                put("method", method.clone());
            }
            Self::RequestFailed {
                id,
                category,
                attempts,
                max_attempts,
                error,
            } => {
                put("id", id.clone());
                put("category", category.to_string());
                put("attempts", attempts.to_string());
                put("max_attempts", max_attempts.to_string());
                put("error", error.clone());
            }
            Self::RequestDropped {
                id,
                category,
                method,
                attempts,
            } => {
                put("id", id.clone());
                put("category", category.to_string());
                put("method", method.clone());
                put("attempts", attempts.to_string());
            }
            Self::DataQueued { id, record_type, priority } => {
                put("id", id.clone());
                put("record_type", record_type.to_string());
                put("priority", priority.to_string());
            }
            Self::DataSynced { id, record_type } => {
                put("id", id.clone());
                put("record_type", record_type.to_string());
            }
            Self::DataFailed { id, record_type, error } => {
                put("id", id.clone());
                put("record_type", record_type.to_string());
                put("error", error.clone());
            }
            Self::Cleared { collection, removed } => {
                put("collection", collection.clone());
                put("removed", removed.to_string());
            }
            Self::Purged { removed } => {
                put("removed", removed.to_string());
            }
            Self::ConfigUpdated { periodic, interval_ms } => {
                put("periodic", periodic.to_string());
                put("interval_ms", interval_ms.to_string());
            }
            Self::ConnectivityChanged { online } => {
                put("online", online.to_string());
            }
        }
        props
    }
}

/// A single line in the telemetry log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub properties: BTreeMap<String, String>,
    pub event: SyncEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: SyncEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            name: event.name().to_string(),
            properties: event.properties(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_event_carries_category() {
        let event = SyncEvent::RequestDropped {
            id: "req-1".to_string(),
            category: Category::Workout,
            method: "POST".to_string(),
            attempts: 1,
        };
        assert_eq!(event.name(), "item_dropped");
        let props = event.properties();
        assert_eq!(props.get("category").map(String::as_str), Some("workout"));
        assert_eq!(props.get("attempts").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SyncEvent::Triggered {
            source: TriggerSource::Periodic,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Triggered\""));
        assert!(json.contains("\"source\":\"periodic\""));

        let back: SyncEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "triggered");
    }

    #[test]
    fn test_log_entry_flattens_name_and_properties() {
        let entry = EventLogEntry::new(SyncEvent::Cleared {
            collection: "sync_data".to_string(),
            removed: 4,
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ts\""));
        assert!(json.contains("\"name\":\"cleared\""));
        assert_eq!(entry.properties.get("removed").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_registered_joins_tags() {
        let event = SyncEvent::Registered {
            tags: vec!["sync-workout".to_string(), "sync-chat".to_string()],
        };
        assert_eq!(
            event.properties().get("tags").map(String::as_str),
            Some("sync-workout,sync-chat")
        );
    }
}
