//! SyncEngine - the public facade
//!
//! Client code enqueues mutations and domain records here without knowing
//! how the queue is stored or drained. Every enqueue persists first; only
//! then, if the engine believes it is online, an opportunistic drain is
//! started in the background.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::background::{BackgroundAgent, BackgroundSyncController, ControllerState};
use crate::config::{Config, SyncConfig};
use crate::connectivity::ConnectivityMonitor;
use crate::domain::{
    Category, HttpMethod, Priority, QueuedRequest, RecordType, RequestTarget, SyncRecord, now_ms,
};
use crate::error::{SyncError, SyncResult};
use crate::events::{EventBus, SyncEvent, TriggerSource, create_event_bus};
use crate::processor::{DrainReport, ProcessorStats, QueueProcessor, SyncDataProcessor};
use crate::state::{Collection, QueueStore};
use crate::transport::Transport;

/// Per-call options for [`SyncEngine::queue_request`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub priority: Priority,
    pub category: Category,
    /// Attempt ceiling; the configured `max-retries` when unset
    pub max_retries: Option<u32>,
}

/// Per-call options for [`SyncEngine::queue_sync_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataOptions {
    pub priority: Priority,
}

/// Snapshot of queue depth and sync health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending_requests: usize,
    pub pending_by_priority: BTreeMap<Priority, usize>,
    pub pending_sync_records: usize,
    pub synced_sync_records: usize,
    pub online: bool,
    pub controller_state: ControllerState,
    pub totals: ProcessorStats,
}

/// One logical sync queue, opened and closed explicitly
pub struct SyncEngine {
    store: QueueStore,
    events: Arc<EventBus>,
    queue: Arc<QueueProcessor>,
    sync_data: Arc<SyncDataProcessor>,
    controller: Arc<BackgroundSyncController>,
    monitor: Arc<ConnectivityMonitor>,
    closed: AtomicBool,
}

impl SyncEngine {
    /// Open the engine over the configured on-disk store
    ///
    /// The engine starts out offline; feed it host signals through
    /// [`SyncEngine::on_reachable`] or [`SyncEngine::watch_connectivity`].
    pub async fn open(
        config: &Config,
        transport: Arc<dyn Transport>,
        agent: Arc<dyn BackgroundAgent>,
    ) -> SyncResult<Self> {
        let db_path = config.storage.resolved_db_path();
        debug!(db_path = %db_path.display(), "SyncEngine::open: called");
        config
            .sync
            .validate()
            .map_err(|e| SyncError::InvalidInput(e.to_string()))?;
        let store = QueueStore::spawn(&db_path)?;
        Ok(Self::open_with_store(store, config, transport, agent))
    }

    /// Open the engine over an already spawned store
    pub fn open_with_store(
        store: QueueStore,
        config: &Config,
        transport: Arc<dyn Transport>,
        agent: Arc<dyn BackgroundAgent>,
    ) -> Self {
        debug!("SyncEngine::open_with_store: called");
        let events = create_event_bus();
        let queue = Arc::new(QueueProcessor::new(
            store.clone(),
            transport.clone(),
            events.clone(),
            config.sync.retry_delay(),
        ));
        let sync_data = Arc::new(SyncDataProcessor::new(
            store.clone(),
            transport,
            events.clone(),
            config.endpoints.clone(),
        ));
        let controller = BackgroundSyncController::new(
            agent,
            queue.clone(),
            sync_data.clone(),
            events.clone(),
            config.sync.clone(),
        );
        let monitor = Arc::new(ConnectivityMonitor::new(controller.clone(), events.clone(), false));

        info!("Sync engine opened");
        Self {
            store,
            events,
            queue,
            sync_data,
            controller,
            monitor,
            closed: AtomicBool::new(false),
        }
    }

    /// Stop the controller and release the store
    ///
    /// Queued items stay on disk for the next open.
    pub async fn close(&self) -> SyncResult<()> {
        debug!("SyncEngine::close: called");
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.controller.destroy().await;
        self.store.close().await?;
        info!("Sync engine closed");
        Ok(())
    }

    fn ensure_open(&self) -> SyncResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SyncError::Closed);
        }
        Ok(())
    }

    /// Queue an outbound request, returning its id
    ///
    /// Fails only when the request could not be persisted; delivery
    /// problems never surface here.
    pub async fn queue_request(
        &self,
        url: impl Into<String>,
        method: HttpMethod,
        body: Option<Value>,
        headers: BTreeMap<String, String>,
        options: RequestOptions,
    ) -> SyncResult<String> {
        let url = url.into();
        debug!(%url, %method, ?options, "SyncEngine::queue_request: called");
        self.ensure_open()?;

        if url.trim().is_empty() {
            return Err(SyncError::InvalidInput("request url is empty".to_string()));
        }
        let max_attempts = match options.max_retries {
            Some(0) => return Err(SyncError::InvalidInput("max_retries must be greater than 0".to_string())),
            Some(n) => n,
            None => self.controller.config().await.max_retries,
        };

        let mut request = QueuedRequest::new(RequestTarget::new(url, method), max_attempts)
            .with_headers(headers)
            .with_priority(options.priority)
            .with_category(options.category);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let id = self.store.add(&request).await?;
        self.events.emit(SyncEvent::RequestQueued {
            id: id.clone(),
            category: request.category,
            priority: request.priority,
        });

        if self.monitor.is_online() {
            self.spawn_request_drain();
        }
        Ok(id)
    }

    /// Queue a domain record for its record-type endpoint, returning its id
    pub async fn queue_sync_data(&self, payload: Value, record_type: RecordType, options: DataOptions) -> SyncResult<String> {
        debug!(%record_type, ?options, "SyncEngine::queue_sync_data: called");
        self.ensure_open()?;

        let record = SyncRecord::new(payload, record_type, options.priority);
        let id = self.store.add(&record).await?;
        self.events.emit(SyncEvent::DataQueued {
            id: id.clone(),
            record_type,
            priority: options.priority,
        });

        if self.monitor.is_online() {
            self.spawn_sync_data_drain();
        }
        Ok(id)
    }

    pub async fn sync_workout(&self, payload: Value, options: DataOptions) -> SyncResult<String> {
        self.queue_sync_data(payload, RecordType::Workout, options).await
    }

    pub async fn sync_nutrition(&self, payload: Value, options: DataOptions) -> SyncResult<String> {
        self.queue_sync_data(payload, RecordType::Nutrition, options).await
    }

    pub async fn sync_progress(&self, payload: Value, options: DataOptions) -> SyncResult<String> {
        self.queue_sync_data(payload, RecordType::Progress, options).await
    }

    pub async fn sync_chat(&self, payload: Value, options: DataOptions) -> SyncResult<String> {
        self.queue_sync_data(payload, RecordType::Chat, options).await
    }

    fn spawn_request_drain(&self) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            events.emit(SyncEvent::Triggered {
                source: TriggerSource::Enqueue,
            });
            if let Err(e) = queue.drain().await {
                warn!(error = %e, "Opportunistic request drain failed");
            }
        })
    }

    fn spawn_sync_data_drain(&self) -> JoinHandle<()> {
        let sync_data = self.sync_data.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            events.emit(SyncEvent::Triggered {
                source: TriggerSource::Enqueue,
            });
            if let Err(e) = sync_data.drain().await {
                warn!(error = %e, "Opportunistic sync data drain failed");
            }
        })
    }

    /// Register background interest with the host agent
    pub async fn register(&self) -> bool {
        self.controller.register().await
    }

    /// Manual sync: re-register and drain both queues now
    pub async fn trigger_sync(&self) -> SyncResult<DrainReport> {
        debug!("SyncEngine::trigger_sync: called");
        self.ensure_open()?;
        Ok(self.controller.trigger_sync().await?)
    }

    /// Entry point for a host-driven background wake-up
    pub async fn handle_background_wake(&self, tag: &str) -> SyncResult<DrainReport> {
        debug!(%tag, "SyncEngine::handle_background_wake: called");
        self.ensure_open()?;
        Ok(self.controller.drain_all(TriggerSource::Background).await?)
    }

    pub async fn on_reachable(&self) -> SyncResult<Option<DrainReport>> {
        self.ensure_open()?;
        Ok(self.monitor.on_reachable().await?)
    }

    pub async fn on_unreachable(&self) -> bool {
        self.monitor.on_unreachable().await
    }

    /// Follow a host reachability stream
    pub fn watch_connectivity(&self, signal: watch::Receiver<bool>) -> JoinHandle<()> {
        self.monitor.watch(signal)
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub async fn controller_state(&self) -> ControllerState {
        self.controller.state().await
    }

    /// Replace the sync configuration at runtime
    pub async fn update_config(&self, config: SyncConfig) -> SyncResult<()> {
        debug!(?config, "SyncEngine::update_config: called");
        config.validate().map_err(|e| SyncError::InvalidInput(e.to_string()))?;
        self.controller.update_config(config).await;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// The telemetry bus, for attaching a logger
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Queue depth, sync health and cumulative totals
    pub async fn status(&self) -> SyncResult<QueueStatus> {
        debug!("SyncEngine::status: called");
        self.ensure_open()?;

        let requests: Vec<QueuedRequest> = self.store.get_all().await?;
        let mut pending_by_priority: BTreeMap<Priority, usize> = Priority::all().into_iter().map(|p| (p, 0)).collect();
        for request in &requests {
            *pending_by_priority.entry(request.priority).or_default() += 1;
        }

        let records: Vec<SyncRecord> = self.store.get_all().await?;
        let synced = records.iter().filter(|r| r.synced).count();

        Ok(QueueStatus {
            pending_requests: requests.len(),
            pending_by_priority,
            pending_sync_records: records.len() - synced,
            synced_sync_records: synced,
            online: self.monitor.is_online(),
            controller_state: self.controller.state().await,
            totals: self.queue.stats().await.merge(self.sync_data.stats().await),
        })
    }

    /// Delete synced records enqueued more than `older_than` ago
    ///
    /// Unsynced records are never swept.
    pub async fn purge_synced(&self, older_than: Duration) -> SyncResult<usize> {
        debug!(?older_than, "SyncEngine::purge_synced: called");
        self.ensure_open()?;

        let older_than_ms = i64::try_from(older_than.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now_ms().saturating_sub(older_than_ms);
        let records: Vec<SyncRecord> = self.store.get_all().await?;
        let mut removed = 0;
        for record in records.iter().filter(|r| r.synced && r.enqueued_at < cutoff) {
            if self.store.delete(Collection::SyncData, &record.id).await? {
                removed += 1;
            }
        }

        info!(removed, "Purged synced records");
        self.events.emit(SyncEvent::Purged { removed });
        Ok(removed)
    }

    pub async fn clear_requests(&self) -> SyncResult<usize> {
        self.clear(Collection::Requests).await
    }

    pub async fn clear_sync_data(&self) -> SyncResult<usize> {
        self.clear(Collection::SyncData).await
    }

    /// Empty both collections
    pub async fn clear_all(&self) -> SyncResult<usize> {
        let requests = self.clear(Collection::Requests).await?;
        let records = self.clear(Collection::SyncData).await?;
        Ok(requests + records)
    }

    async fn clear(&self, collection: Collection) -> SyncResult<usize> {
        debug!(%collection, "SyncEngine::clear: called");
        self.ensure_open()?;
        let removed = self.store.clear(collection).await?;
        info!(%collection, removed, "Cleared collection");
        self.events.emit(SyncEvent::Cleared {
            collection: collection.to_string(),
            removed,
        });
        Ok(removed)
    }
}
