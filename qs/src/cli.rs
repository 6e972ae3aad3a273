//! CLI argument parsing for queuestore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qs")]
#[command(author, version, about = "Inspect a durable queue store", long_about = None)]
pub struct Cli {
    /// Path to the database file
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List collections that hold records
    Collections,

    /// Print every record in a collection as JSON lines
    List {
        /// Collection name
        #[arg(required = true)]
        collection: String,
    },

    /// Count records in a collection
    Count {
        /// Collection name
        #[arg(required = true)]
        collection: String,
    },

    /// Delete every record in a collection
    Clear {
        /// Collection name
        #[arg(required = true)]
        collection: String,
    },
}

/// Default database location: `<data_local_dir>/syncqueue/queue.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("syncqueue")
        .join(crate::DEFAULT_DB_NAME)
}
