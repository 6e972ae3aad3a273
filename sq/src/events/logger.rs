//! Event Logger - persists telemetry events to a JSONL file
//!
//! The EventLogger subscribes to the EventBus and appends every event to a
//! single JSONL file for history and debugging.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, SyncEvent};

/// Event logger that appends events to a JSONL file
pub struct EventLogger {
    log_path: PathBuf,
    /// Opened on first write
    writer: Option<BufWriter<File>>,
}

impl EventLogger {
    /// Create a new event logger writing to `log_path`
    pub fn new(log_path: impl AsRef<Path>) -> Self {
        let log_path = log_path.as_ref().to_path_buf();
        debug!(?log_path, "EventLogger::new: creating logger");
        Self { log_path, writer: None }
    }

    /// Path of the telemetry file
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    fn writer(&mut self) -> eyre::Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            debug!(log_path = ?self.log_path, "EventLogger: opening log file");
            let file = OpenOptions::new().create(true).append(true).open(&self.log_path)?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| eyre::eyre!("telemetry writer not initialized"))
    }

    /// Append one event as a JSON line
    pub fn write_event(&mut self, event: &SyncEvent) -> eyre::Result<()> {
        debug!(event = event.name(), "EventLogger::write_event");
        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;

        let writer = self.writer()?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    /// Run the logger, consuming events from the bus until it closes
    ///
    /// This is meant to be spawned as a background task.
    pub async fn run(mut self, event_bus: Arc<EventBus>) {
        debug!("EventLogger::run: starting event logger");
        let mut rx = event_bus.subscribe();
        // The logger must not keep the bus alive on its own
        drop(event_bus);

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(event = event.name(), error = %e, "EventLogger: failed to write event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

/// Read every entry from a telemetry file
///
/// A missing file yields no entries; malformed lines are skipped.
pub fn read_events(log_path: impl AsRef<Path>) -> eyre::Result<Vec<EventLogEntry>> {
    let log_path = log_path.as_ref();
    debug!(?log_path, "read_events: reading log file");

    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(log_path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_events: loaded entries");
    Ok(entries)
}

/// Spawn the event logger as a background task
pub fn spawn_event_logger(event_bus: Arc<EventBus>, log_path: impl AsRef<Path>) -> tokio::task::JoinHandle<()> {
    let logger = EventLogger::new(log_path);
    tokio::spawn(async move {
        logger.run(event_bus).await;
    })
}
