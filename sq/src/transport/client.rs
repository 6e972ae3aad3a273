//! Transport trait definition

use async_trait::async_trait;

use super::{OutboundRequest, TransportError, TransportResponse};

/// Executes one network call for a queued item
///
/// Implementations must report any non-2xx answer as
/// `TransportError::Status`, so callers can treat "endpoint said no" and
/// "endpoint unreachable" the same way.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tracing::debug;

    /// Mock transport for unit tests
    ///
    /// Records every call. Succeeds unless told to fail everything or a
    /// specific URL.
    #[derive(Default)]
    pub struct MockTransport {
        calls: Mutex<Vec<OutboundRequest>>,
        failing_urls: Mutex<HashSet<String>>,
        fail_all: AtomicBool,
        delay: Option<Duration>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let mock = Self::default();
            mock.set_fail_all(true);
            mock
        }

        /// Hold every call for `delay` before answering
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn set_fail_all(&self, fail: bool) {
            self.fail_all.store(fail, Ordering::SeqCst);
        }

        pub fn fail_url(&self, url: &str) {
            self.failing_urls.lock().unwrap().insert(url.to_string());
        }

        pub fn calls(&self) -> Vec<OutboundRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.url).collect()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
            debug!(url = %request.url, "MockTransport::send: called");
            let url = request.url.clone();
            self.calls.lock().unwrap().push(request);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let fail = self.fail_all.load(Ordering::SeqCst) || self.failing_urls.lock().unwrap().contains(&url);
            if fail {
                return Err(TransportError::Status {
                    status: 503,
                    body: "service unavailable".to_string(),
                });
            }

            Ok(TransportResponse {
                status: 200,
                body: "{}".to_string(),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_transport_records_and_fails_selectively() {
            let mock = MockTransport::new();
            mock.fail_url("/bad");

            assert!(mock.send(OutboundRequest::post_json("/good", serde_json::json!({}))).await.is_ok());
            let err = mock
                .send(OutboundRequest::post_json("/bad", serde_json::json!({})))
                .await
                .unwrap_err();
            assert_eq!(err.status(), Some(503));

            assert_eq!(mock.urls(), vec!["/good", "/bad"]);
        }

        #[tokio::test]
        async fn test_mock_transport_fail_all_toggle() {
            let mock = MockTransport::failing();
            assert!(mock.send(OutboundRequest::post_json("/x", serde_json::json!(1))).await.is_err());
            mock.set_fail_all(false);
            assert!(mock.send(OutboundRequest::post_json("/x", serde_json::json!(1))).await.is_ok());
            assert_eq!(mock.call_count(), 2);
        }
    }
}
