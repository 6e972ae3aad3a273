use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use queuestore::Store;
use queuestore::cli::{Cli, Command, default_db_path};

fn setup_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(default_db_path);

    info!(db = %db_path.display(), "queuestore starting");
    let mut store = Store::open(&db_path).context(format!("Failed to open store at {}", db_path.display()))?;

    match cli.command {
        Command::Collections => {
            let names = store.collections()?;
            if names.is_empty() {
                println!("No collections found");
            } else {
                for name in names {
                    let count = store.count(&name)?;
                    println!("{} {}", name.cyan(), count.to_string().dimmed());
                }
            }
        }
        Command::List { collection } => {
            for value in store.list_values(&collection)? {
                println!("{}", serde_json::to_string(&value)?);
            }
        }
        Command::Count { collection } => {
            println!("{}", store.count(&collection)?);
        }
        Command::Clear { collection } => {
            let removed = store.clear(&collection)?;
            println!("{} Cleared {} records from {}", "✓".green(), removed, collection.cyan());
        }
    }

    Ok(())
}
