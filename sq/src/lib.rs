//! SyncQueue - offline-first durable request queue and background sync
//!
//! SyncQueue keeps capturing user actions while the client is disconnected
//! and delivers them once connectivity returns, in priority order and with
//! bounded retries.
//!
//! # Core Concepts
//!
//! - **Persist First**: every enqueue is durable before any delivery attempt
//! - **Two Collections**: outbound requests carry an attempt ceiling; domain
//!   sync records are retried until delivered
//! - **Single Flight**: each processor runs at most one drain pass at a time
//! - **Explicit Lifecycle**: one engine per session, opened and closed by the caller
//!
//! # Modules
//!
//! - [`domain`] - Queued request and sync record types
//! - [`state`] - Durable queue store actor
//! - [`transport`] - Network seam and HTTP implementation
//! - [`processor`] - Drain processors for both collections
//! - [`background`] - Host agent adapters and the sync controller
//! - [`connectivity`] - Reachability edge detection
//! - [`events`] - Telemetry bus and JSONL logger
//! - [`engine`] - The public facade
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod background;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod processor;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use background::{BackgroundAgent, BackgroundSyncController, CommandAgent, ControllerState, NoopAgent};
pub use config::{Config, EndpointsConfig, SyncConfig};
pub use domain::{Category, HttpMethod, Priority, QueuedRequest, RecordType, RequestTarget, SyncRecord};
pub use engine::{DataOptions, QueueStatus, RequestOptions, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use events::{EventBus, SyncEvent, TriggerSource};
pub use processor::{DrainReport, ProcessorStats};
pub use state::{Collection, QueueStore, StoreError};
pub use transport::{HttpTransport, OutboundRequest, Transport, TransportError, TransportResponse};
