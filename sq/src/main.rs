//! SyncQueue - offline-first request queue and background sync
//!
//! CLI entry point for queuing items, inspecting the queue, and running the
//! sync controller in the foreground.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use syncqueue::background::agent_from_config;
use syncqueue::cli::{ClearTarget, Cli, Command, OutputFormat, get_log_path, parse_headers};
use syncqueue::config::Config;
use syncqueue::domain::{Category, HttpMethod, Priority, RecordType};
use syncqueue::events::spawn_event_logger;
use syncqueue::{DataOptions, DrainReport, HttpTransport, QueueStatus, RequestOptions, SyncEngine};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let transport = Arc::new(HttpTransport::from_config(&config.endpoints).context("Failed to build HTTP transport")?);
    let agent = agent_from_config(&config.background);
    let engine = SyncEngine::open(&config, transport, agent)
        .await
        .context("Failed to open sync engine")?;

    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        Command::Request {
            url,
            method,
            body,
            headers,
            priority,
            category,
            max_retries,
        } => cmd_request(&engine, url, method, body, &headers, priority, category, max_retries).await,
        Command::Data {
            record_type,
            payload,
            priority,
        } => cmd_data(&engine, record_type, &payload, priority).await,
        Command::Status { format } => cmd_status(&engine, format).await,
        Command::Drain => cmd_drain(&engine).await,
        Command::Purge { older_than_hours } => cmd_purge(&engine, older_than_hours).await,
        Command::Clear { target } => cmd_clear(&engine, target).await,
        Command::Run => cmd_run(&engine, &config).await,
    };

    engine.close().await.context("Failed to close sync engine")?;
    result
}

#[allow(clippy::too_many_arguments)]
async fn cmd_request(
    engine: &SyncEngine,
    url: String,
    method: HttpMethod,
    body: Option<String>,
    headers: &[String],
    priority: Priority,
    category: Category,
    max_retries: Option<u32>,
) -> Result<()> {
    debug!(%url, %method, "cmd_request: called");
    let body: Option<serde_json::Value> = body
        .map(|b| serde_json::from_str(&b))
        .transpose()
        .context("Request body is not valid JSON")?;
    let headers = parse_headers(headers).map_err(|e| eyre::eyre!(e))?;
    let options = RequestOptions {
        priority,
        category,
        max_retries,
    };

    let id = engine.queue_request(url, method, body, headers, options).await?;
    println!("{} Queued request {}", "✓".green(), id.cyan());
    Ok(())
}

async fn cmd_data(engine: &SyncEngine, record_type: RecordType, payload: &str, priority: Priority) -> Result<()> {
    debug!(%record_type, "cmd_data: called");
    let payload: serde_json::Value = serde_json::from_str(payload).context("Payload is not valid JSON")?;
    let id = engine
        .queue_sync_data(payload, record_type, DataOptions { priority })
        .await?;
    println!("{} Queued {} record {}", "✓".green(), record_type, id.cyan());
    Ok(())
}

async fn cmd_status(engine: &SyncEngine, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let status = engine.status().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => print_status(&status),
    }
    Ok(())
}

fn print_status(status: &QueueStatus) {
    println!("{}", "Requests".bold());
    println!("  pending: {}", status.pending_requests);
    for (priority, count) in &status.pending_by_priority {
        println!("    {:<7} {}", priority.to_string(), count);
    }
    println!("{}", "Sync data".bold());
    println!("  pending: {}", status.pending_sync_records);
    println!("  synced:  {}", status.synced_sync_records);
    println!("{}", "Controller".bold());
    println!("  state:   {}", status.controller_state);
}

async fn cmd_drain(engine: &SyncEngine) -> Result<()> {
    debug!("cmd_drain: called");
    let report = engine.trigger_sync().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &DrainReport) {
    if report.skipped {
        println!("{} Drain already in progress", "!".yellow());
        return;
    }
    println!(
        "{} processed {}, synced {}, failed {}, dropped {}, waiting {}",
        "✓".green(),
        report.processed,
        report.succeeded.to_string().green(),
        report.failed.to_string().yellow(),
        report.dropped.to_string().red(),
        report.skipped_not_due
    );
}

async fn cmd_purge(engine: &SyncEngine, older_than_hours: u64) -> Result<()> {
    debug!(older_than_hours, "cmd_purge: called");
    let older_than_secs = older_than_hours
        .checked_mul(3_600)
        .ok_or_else(|| eyre::eyre!("--older-than-hours {} is too large", older_than_hours))?;
    let removed = engine.purge_synced(Duration::from_secs(older_than_secs)).await?;
    println!("{} Purged {} synced records", "✓".green(), removed);
    Ok(())
}

async fn cmd_clear(engine: &SyncEngine, target: ClearTarget) -> Result<()> {
    debug!(?target, "cmd_clear: called");
    let removed = match target {
        ClearTarget::Requests => engine.clear_requests().await?,
        ClearTarget::SyncData => engine.clear_sync_data().await?,
        ClearTarget::All => engine.clear_all().await?,
    };
    println!("{} Cleared {} items", "✓".green(), removed);
    Ok(())
}

async fn cmd_run(engine: &SyncEngine, config: &Config) -> Result<()> {
    debug!("cmd_run: called");
    if config.telemetry.enabled {
        let log_path = config.telemetry.resolved_event_log();
        info!(log_path = %log_path.display(), "Telemetry logging enabled");
        spawn_event_logger(engine.events(), log_path);
    }

    if engine.register().await {
        println!("{} Background sync registered", "✓".green());
    } else {
        println!("{} Background sync unavailable, polling in foreground", "!".yellow());
    }

    // A foreground run treats the host as reachable from the start
    if let Some(report) = engine.on_reachable().await? {
        print_report(&report);
    }
    println!("Running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Ctrl-C received, shutting down");
    engine.on_unreachable().await;
    Ok(())
}
