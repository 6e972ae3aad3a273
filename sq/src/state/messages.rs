//! Queue store messages
//!
//! Commands and responses for the actor pattern.

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{QueuedRequest, Record, SyncRecord};

/// Errors from queue store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend missing, failed to open, or the store was closed
    #[error("Queue store unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already queued: {0}")]
    Duplicate(String),

    #[error("Store error: {0}")]
    Backend(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl StoreError {
    /// Check if the backend is unreachable (item must be treated as not queued)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Check if the record was missing (e.g. removed by a concurrent clear)
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<queuestore::StoreError> for StoreError {
    fn from(err: queuestore::StoreError) -> Self {
        match err {
            queuestore::StoreError::NotFound { collection, id } => StoreError::NotFound(format!("{}/{}", collection, id)),
            queuestore::StoreError::Duplicate { collection, id } => {
                StoreError::Duplicate(format!("{}/{}", collection, id))
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Response from queue store operations
pub type StoreResponse<T> = Result<T, StoreError>;

/// The two independent collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Pending outbound requests
    Requests,
    /// Pending sync records
    SyncData,
}

impl Collection {
    /// Backend collection name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Requests => QueuedRequest::collection_name(),
            Self::SyncData => SyncRecord::collection_name(),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Commands sent to the QueueStore actor
#[derive(Debug)]
pub enum StoreCommand {
    Add {
        collection: &'static str,
        id: String,
        data: Value,
        updated_at: i64,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    Get {
        collection: &'static str,
        id: String,
        reply: oneshot::Sender<StoreResponse<Option<Value>>>,
    },
    GetAll {
        collection: &'static str,
        reply: oneshot::Sender<StoreResponse<Vec<Value>>>,
    },
    Update {
        collection: &'static str,
        id: String,
        data: Value,
        updated_at: i64,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    Delete {
        collection: &'static str,
        id: String,
        reply: oneshot::Sender<StoreResponse<bool>>,
    },
    Count {
        collection: &'static str,
        reply: oneshot::Sender<StoreResponse<usize>>,
    },
    Clear {
        collection: &'static str,
        reply: oneshot::Sender<StoreResponse<usize>>,
    },

    // Shutdown
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
