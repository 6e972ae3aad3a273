//! Property tests for drain ordering
//!
//! Whatever order items are enqueued in, one pass delivers them by
//! priority band, FIFO within a band.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use syncqueue::background::NoopAgent;
use syncqueue::config::Config;
use syncqueue::domain::{HttpMethod, Priority};
use syncqueue::{
    OutboundRequest, QueueStore, RequestOptions, SyncEngine, Transport, TransportError, TransportResponse,
};

#[derive(Default)]
struct RecordingTransport {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        self.urls.lock().unwrap().push(request.url);
        Ok(TransportResponse {
            status: 200,
            body: String::new(),
        })
    }
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::High), Just(Priority::Medium), Just(Priority::Low)]
}

fn drain_order(priorities: &[Priority]) -> Vec<String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let transport = Arc::new(RecordingTransport::default());
        let engine = SyncEngine::open_with_store(
            QueueStore::spawn_in_memory().unwrap(),
            &Config::default(),
            transport.clone(),
            Arc::new(NoopAgent),
        );

        for (i, priority) in priorities.iter().enumerate() {
            let options = RequestOptions {
                priority: *priority,
                ..Default::default()
            };
            engine
                .queue_request(format!("/item/{}", i), HttpMethod::Post, None, BTreeMap::new(), options)
                .await
                .unwrap();
        }

        engine.trigger_sync().await.unwrap();
        let urls = transport.urls.lock().unwrap().clone();
        urls
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_single_pass_orders_by_priority_then_arrival(
        priorities in proptest::collection::vec(priority_strategy(), 0..16)
    ) {
        let mut expected: Vec<(usize, Priority)> = priorities.iter().copied().enumerate().collect();
        expected.sort_by_key(|(_, p)| *p);
        let expected: Vec<String> = expected.into_iter().map(|(i, _)| format!("/item/{}", i)).collect();

        prop_assert_eq!(drain_order(&priorities), expected);
    }
}

#[test]
fn test_low_high_medium_scenario() {
    let order = drain_order(&[Priority::Low, Priority::High, Priority::Medium]);
    assert_eq!(order, vec!["/item/1", "/item/2", "/item/0"]);
}
