//! Telemetry events for the sync engine
//!
//! Every state transition (registration, trigger, item synced/dropped, data
//! queued/synced, clear, config update) emits a [`SyncEvent`] on the
//! [`EventBus`]. Consumers such as the JSONL [`EventLogger`] or a status
//! indicator subscribe to the bus.
//!
//! ```text
//!  Controller    QueueProcessor   SyncDataProcessor    Facade
//!      │               │                  │               │
//!      └───────────────┴───── EventBus ───┴───────────────┘
//!                                │
//!                  ┌─────────────┴─────────────┐
//!             EventLogger                status / UI
//!            (telemetry.jsonl)
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, create_event_bus};
pub use logger::{EventLogger, read_events, spawn_event_logger};
pub use types::{EventLogEntry, SyncEvent, TriggerSource};
