//! SyncDataProcessor - delivers unsynced domain records

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EndpointsConfig;
use crate::domain::SyncRecord;
use crate::events::{EventBus, SyncEvent};
use crate::state::{QueueStore, StoreError};
use crate::transport::{OutboundRequest, Transport};

use super::report::{DrainReport, ProcessorStats};

/// Drains the sync data collection
///
/// Every unsynced record is POSTed to the endpoint of its record type. A
/// delivered record is flipped to synced in place; a failed one is left
/// exactly as stored and is attempted again on every later pass. Records
/// are never deleted here.
pub struct SyncDataProcessor {
    store: QueueStore,
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
    endpoints: EndpointsConfig,
    pass: Mutex<()>,
    stats: Mutex<ProcessorStats>,
}

impl SyncDataProcessor {
    pub fn new(store: QueueStore, transport: Arc<dyn Transport>, events: Arc<EventBus>, endpoints: EndpointsConfig) -> Self {
        debug!("SyncDataProcessor::new: called");
        Self {
            store,
            transport,
            events,
            endpoints,
            pass: Mutex::new(()),
            stats: Mutex::new(ProcessorStats::default()),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.pass.try_lock().is_err()
    }

    pub async fn stats(&self) -> ProcessorStats {
        *self.stats.lock().await
    }

    /// Run one drain pass over unsynced records
    pub async fn drain(&self) -> Result<DrainReport, StoreError> {
        debug!("SyncDataProcessor::drain: called");
        let Ok(_pass) = self.pass.try_lock() else {
            debug!("SyncDataProcessor::drain: pass already in progress, skipping");
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
                "Sync data drained"
            );
        }
        Ok(report)
    }

    async fn run_pass(&self) -> Result<DrainReport, StoreError> {
        let records: Vec<SyncRecord> = self.store.get_all().await?;
        let ids: Vec<String> = records.into_iter().filter(|r| !r.synced).map(|r| r.id).collect();
        debug!(count = ids.len(), "SyncDataProcessor::run_pass: unsynced records");

        let mut report = DrainReport::default();
        for id in ids {
            let Some(mut record) = self.store.get::<SyncRecord>(&id).await? else {
                debug!(%id, "SyncDataProcessor::run_pass: record vanished, skipping");
                continue;
            };
            if record.synced {
                continue;
            }

            report.processed += 1;
            let endpoint = self.endpoints.path_for(record.record_type);
            let request = OutboundRequest::post_json(endpoint, record.payload.clone());

            match self.transport.send(request).await {
                Ok(_) => {
                    record.mark_synced();
                    match self.store.update(&record).await {
                        Ok(()) => {}
                        Err(e) if e.is_not_found() => {
                            debug!(%id, "SyncDataProcessor::run_pass: record removed during delivery, skipping");
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                    report.succeeded += 1;
                    self.events.emit(SyncEvent::DataSynced {
                        id,
                        record_type: record.record_type,
                    });
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(%id, record_type = %record.record_type, %endpoint, error = %error, "Sync data delivery failed");
                    // Left untouched in the store; the next pass tries again
                    report.failed += 1;
                    self.events.emit(SyncEvent::DataFailed {
                        id,
                        record_type: record.record_type,
                        error,
                    });
                }
            }
        }

        Ok(report)
    }
}
