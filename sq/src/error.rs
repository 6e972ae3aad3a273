//! Engine-level errors surfaced to callers of the facade

use thiserror::Error;

use crate::state::StoreError;
use crate::transport::TransportError;

/// Errors returned by [`crate::SyncEngine`]
#[derive(Debug, Error)]
pub enum SyncError {
    /// The item was not durably queued, or the store could not be read
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Sync engine is closed")]
    Closed,
}

impl SyncError {
    /// Check if the failure means nothing was persisted
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_unavailable(),
            SyncError::Closed => true,
            _ => false,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
