//! QueuedRequest domain type
//!
//! An outbound network call captured while (possibly) offline. Carries an
//! attempt ceiling: once `attempts` reaches `max_attempts` the item is
//! dropped instead of being stored again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use queuestore::{Record, now_ms};

use super::category::Category;
use super::id::generate_id;
use super::priority::Priority;

/// HTTP verb of a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Unsupported method: {}", s)),
        }
    }
}

/// Destination and verb of a queued request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTarget {
    /// Absolute URL, or a path resolved against the configured base URL
    pub url: String,

    pub method: HttpMethod,
}

impl RequestTarget {
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        Self { url: url.into(), method }
    }
}

/// A pending outbound request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Unique identifier
    pub id: String,

    pub target: RequestTarget,

    /// Headers captured verbatim at enqueue time
    pub headers: BTreeMap<String, String>,

    /// Body captured verbatim at enqueue time
    pub body: Option<Value>,

    /// Enqueue timestamp (Unix milliseconds)
    pub enqueued_at: i64,

    /// Failed delivery attempts so far
    pub attempts: u32,

    /// Attempt ceiling; always greater than `attempts` while stored
    pub max_attempts: u32,

    pub priority: Priority,

    /// Informational only
    pub category: Category,

    /// Time of the last failed attempt (Unix milliseconds)
    #[serde(default)]
    pub last_attempt_at: Option<i64>,

    /// Last failure message (if any)
    #[serde(default)]
    pub last_error: Option<String>,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl QueuedRequest {
    /// Create a new request with generated ID
    pub fn new(target: RequestTarget, max_attempts: u32) -> Self {
        let now = now_ms();
        Self {
            id: generate_id("req"),
            target,
            headers: BTreeMap::new(),
            body: None,
            enqueued_at: now,
            attempts: 0,
            max_attempts,
            priority: Priority::default(),
            category: Category::default(),
            last_attempt_at: None,
            last_error: None,
            updated_at: now,
        }
    }

    /// Builder: set body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builder: set headers
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Builder: set priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: set category
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Record a failed attempt; returns true when the ceiling is reached
    pub fn record_failure(&mut self, error: impl Into<String>) -> bool {
        let now = now_ms();
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.last_error = Some(error.into());
        self.updated_at = now;
        self.is_exhausted()
    }

    /// Check whether the attempt ceiling has been reached
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Check whether enough time has passed since the last failed attempt
    pub fn is_due(&self, now: i64, retry_delay_ms: u64) -> bool {
        match self.last_attempt_at {
            Some(last) => now.saturating_sub(last) >= i64::try_from(retry_delay_ms).unwrap_or(i64::MAX),
            None => true,
        }
    }

    /// Ordering key for a drain pass: priority band, then arrival
    pub fn drain_key(&self) -> (Priority, i64) {
        (self.priority, self.enqueued_at)
    }
}

impl Record for QueuedRequest {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "requests"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RequestTarget {
        RequestTarget::new("/api/workouts", HttpMethod::Post)
    }

    #[test]
    fn test_queued_request_new() {
        let req = QueuedRequest::new(target(), 3);
        assert!(req.id.starts_with("req-"));
        assert_eq!(req.attempts, 0);
        assert_eq!(req.max_attempts, 3);
        assert_eq!(req.priority, Priority::Medium);
        assert_eq!(req.category, Category::General);
        assert!(req.last_attempt_at.is_none());
        assert!(!req.is_exhausted());
    }

    #[test]
    fn test_record_failure_until_exhausted() {
        let mut req = QueuedRequest::new(target(), 2);
        assert!(!req.record_failure("timeout"));
        assert_eq!(req.attempts, 1);
        assert_eq!(req.last_error.as_deref(), Some("timeout"));
        assert!(req.record_failure("503"));
        assert!(req.is_exhausted());
    }

    #[test]
    fn test_is_due() {
        let mut req = QueuedRequest::new(target(), 5);
        assert!(req.is_due(now_ms(), 60_000));

        req.last_attempt_at = Some(1_000);
        assert!(!req.is_due(1_500, 1_000));
        assert!(req.is_due(2_000, 1_000));
        assert!(req.is_due(1_000, 0));
        assert!(!req.is_due(2_000, u64::MAX));
    }

    #[test]
    fn test_drain_key_orders_priority_first() {
        let mut low = QueuedRequest::new(target(), 3).with_priority(Priority::Low);
        low.enqueued_at = 1;
        let mut high = QueuedRequest::new(target(), 3).with_priority(Priority::High);
        high.enqueued_at = 2;
        assert!(high.drain_key() < low.drain_key());
    }

    #[test]
    fn test_method_serde_and_parse() {
        assert_eq!(serde_json::to_string(&HttpMethod::Patch).unwrap(), "\"PATCH\"");
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_record_roundtrip_keeps_body_verbatim() {
        let body = serde_json::json!({"id": "w1", "sets": [5, 5, 5], "note": null});
        let req = QueuedRequest::new(target(), 3).with_body(body.clone());
        let json = serde_json::to_value(&req).unwrap();
        let back: QueuedRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.body, Some(body));
        assert_eq!(QueuedRequest::collection_name(), "requests");
    }
}
