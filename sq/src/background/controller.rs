//! BackgroundSyncController - registration, periodic timer, and triggers

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::events::{EventBus, SyncEvent, TriggerSource};
use crate::processor::{DrainReport, QueueProcessor, SyncDataProcessor};
use crate::state::StoreError;

use super::agent::BackgroundAgent;

/// Registration lifecycle of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ControllerState {
    Unregistered,
    Registering,
    Registered { periodic_active: bool },
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::Registering => write!(f, "registering"),
            Self::Registered { periodic_active: true } => write!(f, "registered (periodic active)"),
            Self::Registered { periodic_active: false } => write!(f, "registered (periodic inactive)"),
        }
    }
}

struct ControllerInner {
    state: ControllerState,
    /// Whether every tag was accepted on the last registration
    background_supported: bool,
    /// Cleared only when the host reports registration as unsupported
    host_supported: bool,
    /// Set by `start_periodic`, cleared by `stop_periodic`; the connectivity
    /// monitor drives both on online/offline edges
    periodic_wanted: bool,
    /// Stop signal of the running periodic timer
    timer: Option<oneshot::Sender<()>>,
    config: SyncConfig,
}

/// Result of offering a tag set to the host
#[derive(Debug, Clone, Copy)]
struct TagOutcome {
    host_supported: bool,
    all_accepted: bool,
}

impl ControllerInner {
    fn sync_periodic_flag(&mut self) {
        if let ControllerState::Registered { .. } = self.state {
            self.state = ControllerState::Registered {
                periodic_active: self.timer.is_some(),
            };
        }
    }
}

/// Orchestrates background registration and drain triggers
///
/// Never touches the queue store directly; draining goes through the two
/// processors, so destroying the controller leaves every queued item intact.
pub struct BackgroundSyncController {
    agent: Arc<dyn BackgroundAgent>,
    queue: Arc<QueueProcessor>,
    sync_data: Arc<SyncDataProcessor>,
    events: Arc<EventBus>,
    inner: Mutex<ControllerInner>,
}

impl BackgroundSyncController {
    pub fn new(
        agent: Arc<dyn BackgroundAgent>,
        queue: Arc<QueueProcessor>,
        sync_data: Arc<SyncDataProcessor>,
        events: Arc<EventBus>,
        config: SyncConfig,
    ) -> Arc<Self> {
        debug!(agent = agent.name(), ?config, "BackgroundSyncController::new: called");
        Arc::new(Self {
            agent,
            queue,
            sync_data,
            events,
            inner: Mutex::new(ControllerInner {
                state: ControllerState::Unregistered,
                background_supported: false,
                host_supported: false,
                periodic_wanted: false,
                timer: None,
                config,
            }),
        })
    }

    pub async fn state(&self) -> ControllerState {
        self.inner.lock().await.state
    }

    pub async fn config(&self) -> SyncConfig {
        self.inner.lock().await.config.clone()
    }

    pub async fn is_periodic_active(&self) -> bool {
        self.inner.lock().await.timer.is_some()
    }

    /// Register background interest for every enabled category
    ///
    /// Returns false when the host cannot (or would not) take the
    /// registration; the engine then relies on foreground polling alone.
    /// Once registered, further calls return the earlier outcome without
    /// contacting the host.
    pub async fn register(&self) -> bool {
        debug!("BackgroundSyncController::register: called");
        let mut inner = self.inner.lock().await;
        if let ControllerState::Registered { .. } = inner.state {
            debug!("BackgroundSyncController::register: already registered");
            return inner.background_supported;
        }

        inner.state = ControllerState::Registering;
        let tags = inner.config.enabled_tags();
        let outcome = self.register_tags(&tags).await;
        let supported = outcome.host_supported && outcome.all_accepted;

        inner.background_supported = supported;
        inner.host_supported = outcome.host_supported;
        inner.state = ControllerState::Registered {
            periodic_active: inner.timer.is_some(),
        };
        if supported {
            info!(agent = self.agent.name(), "Background sync registered");
        } else {
            info!(agent = self.agent.name(), "Background sync unavailable, using foreground polling");
        }
        supported
    }

    async fn register_tags(&self, tags: &std::collections::BTreeSet<String>) -> TagOutcome {
        let mut accepted = Vec::new();
        let mut all_accepted = true;

        for tag in tags {
            match self.agent.register(tag).await {
                Ok(()) => accepted.push(tag.clone()),
                Err(e) if e.is_unsupported() => {
                    debug!(%tag, "BackgroundSyncController::register_tags: host unsupported");
                    return TagOutcome {
                        host_supported: false,
                        all_accepted: false,
                    };
                }
                Err(e) => {
                    warn!(%tag, error = %e, "Background registration failed");
                    all_accepted = false;
                    self.events.emit(SyncEvent::RegistrationFailed {
                        tag: tag.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !accepted.is_empty() {
            self.events.emit(SyncEvent::Registered { tags: accepted });
        }
        TagOutcome {
            host_supported: true,
            all_accepted,
        }
    }

    /// Re-register every enabled tag while the host supports registration
    ///
    /// Tags rejected earlier are offered again too.
    async fn reregister(&self) {
        let tags = {
            let inner = self.inner.lock().await;
            let registered = matches!(inner.state, ControllerState::Registered { .. });
            if !registered || !inner.host_supported {
                return;
            }
            inner.config.enabled_tags()
        };
        debug!(count = tags.len(), "BackgroundSyncController::reregister: called");
        let outcome = self.register_tags(&tags).await;

        let mut inner = self.inner.lock().await;
        // destroy() may have run while the host was being contacted
        if matches!(inner.state, ControllerState::Registered { .. }) {
            inner.host_supported = outcome.host_supported;
            inner.background_supported = outcome.host_supported && outcome.all_accepted;
        }
    }

    /// Start the foreground periodic timer
    ///
    /// Returns false when periodic sync is disabled; the request is
    /// remembered, and the timer starts once a config update enables it.
    /// Starting an already running timer is a no-op.
    pub async fn start_periodic(self: &Arc<Self>) -> bool {
        debug!("BackgroundSyncController::start_periodic: called");
        let mut inner = self.inner.lock().await;
        inner.periodic_wanted = true;
        self.spawn_timer(&mut inner)
    }

    fn spawn_timer(self: &Arc<Self>, inner: &mut ControllerInner) -> bool {
        if !inner.config.enable_periodic_sync {
            debug!("BackgroundSyncController::spawn_timer: periodic sync disabled");
            return false;
        }
        if inner.timer.is_some() {
            return true;
        }

        let period = inner.config.sync_interval();
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(periodic_loop(Arc::downgrade(self), period, stop_rx));
        inner.timer = Some(stop_tx);
        inner.sync_periodic_flag();
        info!(?period, "Periodic sync started");
        true
    }

    /// Stop the foreground periodic timer
    pub async fn stop_periodic(&self) {
        debug!("BackgroundSyncController::stop_periodic: called");
        let mut inner = self.inner.lock().await;
        inner.periodic_wanted = false;
        stop_timer(&mut inner);
    }

    /// Manual sync: re-register with the host, then drain both queues
    pub async fn trigger_sync(&self) -> Result<DrainReport, StoreError> {
        debug!("BackgroundSyncController::trigger_sync: called");
        self.reregister().await;
        self.drain_all(TriggerSource::Manual).await
    }

    /// Run one pass of each processor
    pub async fn drain_all(&self, source: TriggerSource) -> Result<DrainReport, StoreError> {
        debug!(%source, "BackgroundSyncController::drain_all: called");
        self.events.emit(SyncEvent::Triggered { source });
        let requests = self.queue.drain().await?;
        let records = self.sync_data.drain().await?;
        Ok(requests.merge(records))
    }

    async fn periodic_tick(&self) {
        debug!("BackgroundSyncController::periodic_tick: called");
        // Some hosts consume an interest once it has fired
        self.reregister().await;
        if let Err(e) = self.drain_all(TriggerSource::Periodic).await {
            warn!(error = %e, "Periodic drain failed");
        }
    }

    /// Swap the sync configuration
    ///
    /// When the interval or enablement changed, the timer is stopped and
    /// started again if periodic sync is wanted (online) and enabled;
    /// interests are re-registered when the category set changed.
    pub async fn update_config(self: &Arc<Self>, config: SyncConfig) {
        debug!(?config, "BackgroundSyncController::update_config: called");
        self.queue.set_retry_delay(config.retry_delay());

        let tags_changed = {
            let mut inner = self.inner.lock().await;
            let old = std::mem::replace(&mut inner.config, config.clone());
            let timing_changed =
                old.sync_interval_ms != config.sync_interval_ms || old.enable_periodic_sync != config.enable_periodic_sync;
            if timing_changed {
                stop_timer(&mut inner);
                if inner.periodic_wanted {
                    self.spawn_timer(&mut inner);
                }
            }
            old.enabled_tags() != config.enabled_tags()
        };

        if tags_changed {
            self.reregister().await;
        }

        self.events.emit(SyncEvent::ConfigUpdated {
            periodic: config.enable_periodic_sync,
            interval_ms: config.sync_interval_ms,
        });
    }

    /// Tear down: stop the timer and forget the registration
    ///
    /// Queued items are left untouched.
    pub async fn destroy(&self) {
        debug!("BackgroundSyncController::destroy: called");
        let mut inner = self.inner.lock().await;
        if let Some(stop) = inner.timer.take() {
            let _ = stop.send(());
        }
        inner.state = ControllerState::Unregistered;
        inner.background_supported = false;
        inner.host_supported = false;
        inner.periodic_wanted = false;
        info!("Background sync controller destroyed");
    }
}

fn stop_timer(inner: &mut ControllerInner) {
    if let Some(stop) = inner.timer.take() {
        let _ = stop.send(());
        info!("Periodic sync stopped");
    }
    inner.sync_periodic_flag();
}

/// Timer task; a tick in progress always runs its drain to completion
async fn periodic_loop(
    controller: Weak<BackgroundSyncController>,
    period: std::time::Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("periodic_loop: stopped");
                return;
            }
            _ = interval.tick() => {}
        }
        let Some(controller) = controller.upgrade() else {
            debug!("periodic_loop: controller dropped, exiting");
            return;
        };
        controller.periodic_tick().await;
    }
}
