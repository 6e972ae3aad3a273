//! Request/response types for the transport seam

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{HttpMethod, QueuedRequest};

/// A single network call to execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl OutboundRequest {
    /// POST of a JSON payload, as used for sync record delivery
    pub fn post_json(url: impl Into<String>, payload: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Some(payload),
        }
    }
}

impl From<&QueuedRequest> for OutboundRequest {
    fn from(req: &QueuedRequest) -> Self {
        Self {
            method: req.target.method,
            url: req.target.url.clone(),
            headers: req.headers.clone(),
            body: req.body.clone(),
        }
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}
