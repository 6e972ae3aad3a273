//! CLI command definitions and subcommands

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::domain::{Category, HttpMethod, Priority, RecordType};

/// SyncQueue - offline-first request queue and background sync
#[derive(Parser)]
#[command(
    name = "sq",
    version,
    about = "Offline-first durable request queue and background sync engine"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Queue an outbound request
    Request {
        /// Absolute URL, or a path joined to the configured base URL
        url: String,

        /// HTTP method
        #[arg(short, long, default_value = "POST")]
        method: HttpMethod,

        /// JSON body
        #[arg(short, long)]
        body: Option<String>,

        /// Header as NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Priority band (high, medium, low)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Category (workout, nutrition, progress, chat, general)
        #[arg(long, default_value = "general")]
        category: Category,

        /// Attempt ceiling (defaults to the configured max-retries)
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Queue a domain record for its sync endpoint
    Data {
        /// Record type (workout, nutrition, progress, chat)
        #[arg(value_name = "TYPE")]
        record_type: RecordType,

        /// JSON payload
        payload: String,

        /// Priority band (high, medium, low)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
    },

    /// Show queue depth and sync totals
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Drain both queues once
    Drain,

    /// Delete synced records older than the given age
    Purge {
        /// Minimum age in hours
        #[arg(long, default_value = "24")]
        older_than_hours: u64,
    },

    /// Delete queued items
    Clear {
        /// Which collection to clear
        #[arg(value_enum, default_value = "all")]
        target: ClearTarget,
    },

    /// Run the sync controller in the foreground until Ctrl-C
    Run,
}

/// Output format for the status command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Collections addressed by `clear`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClearTarget {
    Requests,
    SyncData,
    All,
}

/// Parse repeated `NAME:VALUE` header arguments
pub fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    debug!(count = raw.len(), "parse_headers: called");
    let mut headers = BTreeMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| format!("Invalid header '{}', expected NAME:VALUE", entry))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Invalid header '{}', empty name", entry));
        }
        headers.insert(name.to_string(), value.trim().to_string());
    }
    Ok(headers)
}

/// Log file location: `<data_local_dir>/syncqueue/logs/syncqueue.log`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("syncqueue")
        .join("logs")
        .join("syncqueue.log")
}
