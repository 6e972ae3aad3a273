//! ConnectivityMonitor - edge detector over host reachability signals

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::background::BackgroundSyncController;
use crate::events::{EventBus, SyncEvent, TriggerSource};
use crate::processor::DrainReport;
use crate::state::StoreError;

/// Holds only the last observed reachability
///
/// Repeating the current state is a no-op, so hosts that fire the same
/// signal twice do not cause a second drain.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    controller: Arc<BackgroundSyncController>,
    events: Arc<EventBus>,
}

impl ConnectivityMonitor {
    pub fn new(controller: Arc<BackgroundSyncController>, events: Arc<EventBus>, initially_online: bool) -> Self {
        debug!(initially_online, "ConnectivityMonitor::new: called");
        Self {
            online: AtomicBool::new(initially_online),
            controller,
            events,
        }
    }

    /// Last observed reachability
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Host reports the network became reachable
    ///
    /// On an offline to online edge, starts the periodic timer and runs one
    /// drain of both processors. Returns `None` for a duplicate signal.
    pub async fn on_reachable(&self) -> Result<Option<DrainReport>, StoreError> {
        debug!("ConnectivityMonitor::on_reachable: called");
        if self.online.swap(true, Ordering::SeqCst) {
            debug!("ConnectivityMonitor::on_reachable: already online");
            return Ok(None);
        }

        info!("Connectivity restored");
        self.events.emit(SyncEvent::ConnectivityChanged { online: true });
        self.controller.start_periodic().await;
        let report = self.controller.drain_all(TriggerSource::Connectivity).await?;
        Ok(Some(report))
    }

    /// Host reports the network became unreachable
    ///
    /// Returns false for a duplicate signal.
    pub async fn on_unreachable(&self) -> bool {
        debug!("ConnectivityMonitor::on_unreachable: called");
        if !self.online.swap(false, Ordering::SeqCst) {
            debug!("ConnectivityMonitor::on_unreachable: already offline");
            return false;
        }

        info!("Connectivity lost");
        self.events.emit(SyncEvent::ConnectivityChanged { online: false });
        self.controller.stop_periodic().await;
        true
    }

    /// Follow a host signal stream until its sender is dropped
    ///
    /// The current value is applied first, then every change.
    pub fn watch(self: &Arc<Self>, mut signal: watch::Receiver<bool>) -> JoinHandle<()> {
        debug!("ConnectivityMonitor::watch: called");
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                let reachable = *signal.borrow_and_update();
                if reachable {
                    if let Err(e) = monitor.on_reachable().await {
                        warn!(error = %e, "Drain after reconnect failed");
                    }
                } else {
                    monitor.on_unreachable().await;
                }

                if signal.changed().await.is_err() {
                    debug!("ConnectivityMonitor::watch: signal closed");
                    return;
                }
            }
        })
    }
}
