//! Transport error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while delivering an item
///
/// Every variant counts as a failed attempt; the classification below is
/// used for logging only.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Offline: {0}")]
    Unreachable(String),
}

impl TransportError {
    /// Check if a later attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            TransportError::Network(_) => true,
            TransportError::Timeout(_) => true,
            TransportError::InvalidRequest(_) => false,
            TransportError::Unreachable(_) => true,
        }
    }

    /// HTTP status if the endpoint answered
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
