//! QueueProcessor - drains pending requests in priority order

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{QueuedRequest, now_ms};
use crate::events::{EventBus, SyncEvent};
use crate::state::{Collection, QueueStore, StoreError};
use crate::transport::{OutboundRequest, Transport};

use super::report::{DrainReport, ProcessorStats};

/// Drains the request collection one item at a time
///
/// Items run in `(priority, enqueued_at)` order. A success deletes the
/// item; a failure bumps its attempt counter, and the item is dropped once
/// the counter reaches its ceiling.
pub struct QueueProcessor {
    store: QueueStore,
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
    retry_delay_ms: AtomicU64,
    /// Held for the duration of a pass
    pass: Mutex<()>,
    stats: Mutex<ProcessorStats>,
}

impl QueueProcessor {
    pub fn new(store: QueueStore, transport: Arc<dyn Transport>, events: Arc<EventBus>, retry_delay: Duration) -> Self {
        debug!(?retry_delay, "QueueProcessor::new: called");
        Self {
            store,
            transport,
            events,
            retry_delay_ms: AtomicU64::new(duration_ms(retry_delay)),
            pass: Mutex::new(()),
            stats: Mutex::new(ProcessorStats::default()),
        }
    }

    /// Change the minimum gap between attempts of the same request
    pub fn set_retry_delay(&self, retry_delay: Duration) {
        debug!(?retry_delay, "QueueProcessor::set_retry_delay: called");
        self.retry_delay_ms.store(duration_ms(retry_delay), Ordering::SeqCst);
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.load(Ordering::SeqCst))
    }

    /// Check whether a pass is currently running
    pub fn is_draining(&self) -> bool {
        self.pass.try_lock().is_err()
    }

    /// Cumulative totals across all passes
    pub async fn stats(&self) -> ProcessorStats {
        *self.stats.lock().await
    }

    /// Run one drain pass
    ///
    /// Returns a skipped report without touching the store when another
    /// pass is already running. Transport failures are absorbed into retry
    /// state; store failures abort the pass and propagate.
    pub async fn drain(&self) -> Result<DrainReport, StoreError> {
        debug!("QueueProcessor::drain: called");
        let Ok(_pass) = self.pass.try_lock() else {
            debug!("QueueProcessor::drain: pass already in progress, skipping");
            let report = DrainReport::skipped();
            self.stats.lock().await.record(&report);
            return Ok(report);
        };

        let report = self.run_pass().await?;
        self.stats.lock().await.record(&report);

        if !report.is_empty() {
            info!(
                processed = report.processed,
                succeeded = report.succeeded,
                failed = report.failed,
                dropped = report.dropped,
                "Request queue drained"
            );
        }
        Ok(report)
    }

    async fn run_pass(&self) -> Result<DrainReport, StoreError> {
        let mut items: Vec<QueuedRequest> = self.store.get_all().await?;
        if items.is_empty() {
            debug!("QueueProcessor::run_pass: queue is empty");
            return Ok(DrainReport::default());
        }

        // Stable sort keeps insertion order for identical keys
        items.sort_by_key(QueuedRequest::drain_key);
        let ids: Vec<String> = items.into_iter().map(|item| item.id).collect();
        debug!(count = ids.len(), "QueueProcessor::run_pass: ordered items");

        let retry_delay_ms = self.retry_delay_ms.load(Ordering::SeqCst);
        let mut report = DrainReport::default();

        for id in ids {
            // Re-fetch: another actor may have removed or changed the item
            let Some(mut item) = self.store.get::<QueuedRequest>(&id).await? else {
                debug!(%id, "QueueProcessor::run_pass: item vanished, skipping");
                continue;
            };

            if !item.is_due(now_ms(), retry_delay_ms) {
                debug!(%id, "QueueProcessor::run_pass: retry delay not elapsed");
                report.skipped_not_due += 1;
                continue;
            }

            report.processed += 1;
            match self.transport.send(OutboundRequest::from(&item)).await {
                Ok(response) => {
                    debug!(%id, status = response.status, "QueueProcessor::run_pass: delivered");
                    self.store.delete(Collection::Requests, &id).await?;
                    report.succeeded += 1;
                    self.events.emit(SyncEvent::RequestSynced {
                        id,
                        category: item.category,
                        method: item.target.method.to_string(),
                    });
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(%id, url = %item.target.url, retryable = e.is_retryable(), error = %error, "Request delivery failed");

                    if item.record_failure(error.clone()) {
                        self.store.delete(Collection::Requests, &id).await?;
                        report.dropped += 1;
                        warn!(%id, attempts = item.attempts, category = %item.category, "Request dropped after exhausting attempts");
                        self.events.emit(SyncEvent::RequestDropped {
                            id,
                            category: item.category,
                            method: item.target.method.to_string(),
                            attempts: item.attempts,
                        });
                    } else {
                        match self.store.update(&item).await {
                            Ok(()) => {}
                            Err(e) if e.is_not_found() => {
                                debug!(%id, "QueueProcessor::run_pass: item removed during delivery, skipping");
                                continue;
                            }
                            Err(e) => return Err(e),
                        }
                        report.failed += 1;
                        self.events.emit(SyncEvent::RequestFailed {
                            id,
                            category: item.category,
                            attempts: item.attempts,
                            max_attempts: item.max_attempts,
                            error,
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, HttpMethod, Priority, RequestTarget};
    use crate::transport::client::mock::MockTransport;

    struct Fixture {
        store: QueueStore,
        transport: Arc<MockTransport>,
        events: Arc<EventBus>,
        processor: QueueProcessor,
    }

    fn fixture(transport: MockTransport) -> Fixture {
        let store = QueueStore::spawn_in_memory().unwrap();
        let transport = Arc::new(transport);
        let events = Arc::new(EventBus::new(64));
        let processor = QueueProcessor::new(store.clone(), transport.clone(), events.clone(), Duration::ZERO);
        Fixture {
            store,
            transport,
            events,
            processor,
        }
    }

    fn request(url: &str, priority: Priority, enqueued_at: i64, max_attempts: u32) -> QueuedRequest {
        let mut req = QueuedRequest::new(RequestTarget::new(url, HttpMethod::Post), max_attempts)
            .with_priority(priority)
            .with_category(Category::Workout);
        req.enqueued_at = enqueued_at;
        req
    }

    #[tokio::test]
    async fn test_empty_queue_makes_no_calls() {
        let f = fixture(MockTransport::new());
        let first = f.processor.drain().await.unwrap();
        let second = f.processor.drain().await.unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_priority_then_arrival_order() {
        let f = fixture(MockTransport::new());
        f.store.add(&request("/low", Priority::Low, 1, 3)).await.unwrap();
        f.store.add(&request("/high", Priority::High, 2, 3)).await.unwrap();
        f.store.add(&request("/medium", Priority::Medium, 3, 3)).await.unwrap();
        f.store.add(&request("/high-later", Priority::High, 4, 3)).await.unwrap();

        let report = f.processor.drain().await.unwrap();
        assert_eq!(report.succeeded, 4);
        assert_eq!(f.transport.urls(), vec!["/high", "/high-later", "/medium", "/low"]);
        assert_eq!(f.store.count(Collection::Requests).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_increments_attempts_and_keeps_item() {
        let f = fixture(MockTransport::failing());
        let req = request("/api/workouts", Priority::High, 1, 3);
        let id = f.store.add(&req).await.unwrap();

        let report = f.processor.drain().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.dropped, 0);

        let stored: QueuedRequest = f.store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
        assert!(stored.last_error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_exhaustion_after_exactly_max_attempts() {
        let f = fixture(MockTransport::failing());
        let mut rx = f.events.subscribe();
        f.store.add(&request("/api/workouts", Priority::High, 1, 3)).await.unwrap();

        for _ in 0..2 {
            let report = f.processor.drain().await.unwrap();
            assert_eq!(report.failed, 1);
        }
        let report = f.processor.drain().await.unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(f.transport.call_count(), 3);
        assert_eq!(f.store.count(Collection::Requests).await.unwrap(), 0);

        // Nothing left to attempt
        f.processor.drain().await.unwrap();
        assert_eq!(f.transport.call_count(), 3);

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.name());
        }
        assert_eq!(names, vec!["item_failed", "item_failed", "item_dropped"]);

        let stats = f.processor.stats().await;
        assert_eq!(stats.total_failed, 2);
        assert_eq!(stats.total_dropped, 1);
    }

    #[tokio::test]
    async fn test_dropped_event_carries_category() {
        let f = fixture(MockTransport::failing());
        let mut rx = f.events.subscribe();
        f.store.add(&request("/api/workouts", Priority::High, 1, 1)).await.unwrap();

        let report = f.processor.drain().await.unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(f.store.count(Collection::Requests).await.unwrap(), 0);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.name(), "item_dropped");
        assert_eq!(event.properties().get("category").map(String::as_str), Some("workout"));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_rest() {
        let f = fixture(MockTransport::new());
        f.transport.fail_url("/bad");
        f.store.add(&request("/bad", Priority::High, 1, 3)).await.unwrap();
        f.store.add(&request("/good", Priority::Low, 2, 3)).await.unwrap();

        let report = f.processor.drain().await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(f.store.count(Collection::Requests).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_delay_gates_recent_failures() {
        let f = fixture(MockTransport::failing());
        f.processor.set_retry_delay(Duration::from_secs(3_600));
        f.store.add(&request("/api/meals", Priority::Medium, 1, 5)).await.unwrap();

        let first = f.processor.drain().await.unwrap();
        assert_eq!(first.failed, 1);

        let second = f.processor.drain().await.unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped_not_due, 1);
        assert_eq!(f.transport.call_count(), 1);

        f.processor.set_retry_delay(Duration::ZERO);
        let third = f.processor.drain().await.unwrap();
        assert_eq!(third.processed, 1);
        assert_eq!(f.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_drain_is_skipped() {
        let f = fixture(MockTransport::new().with_delay(Duration::from_millis(200)));
        let processor = Arc::new(f.processor);
        f.store.add(&request("/slow", Priority::High, 1, 3)).await.unwrap();

        let running = {
            let processor = processor.clone();
            tokio::spawn(async move { processor.drain().await })
        };
        while !processor.is_draining() {
            tokio::task::yield_now().await;
        }

        let overlapping = processor.drain().await.unwrap();
        assert!(overlapping.skipped);

        let first = running.await.unwrap().unwrap();
        assert_eq!(first.succeeded, 1);
        assert_eq!(f.transport.call_count(), 1);
        assert_eq!(processor.stats().await.total_skipped_passes, 1);
    }

    /// Clears the request collection while a delivery is in flight
    struct ClearingTransport {
        store: QueueStore,
    }

    #[async_trait::async_trait]
    impl Transport for ClearingTransport {
        async fn send(
            &self,
            _request: OutboundRequest,
        ) -> Result<crate::transport::TransportResponse, crate::transport::TransportError> {
            self.store.clear(Collection::Requests).await.unwrap();
            Err(crate::transport::TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_clear_during_delivery_skips_vanished_items() {
        let store = QueueStore::spawn_in_memory().unwrap();
        let transport = Arc::new(ClearingTransport { store: store.clone() });
        let processor = QueueProcessor::new(store.clone(), transport, Arc::new(EventBus::new(64)), Duration::ZERO);
        store.add(&request("/first", Priority::High, 1, 3)).await.unwrap();
        store.add(&request("/second", Priority::Low, 2, 3)).await.unwrap();

        let report = processor.drain().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.dropped, 0);
        assert_eq!(store.count(Collection::Requests).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_store_propagates() {
        let f = fixture(MockTransport::new());
        f.store.close().await.unwrap();
        let err = f.processor.drain().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
