//! SyncQueue configuration types and loading

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Category, RecordType};

/// Main SyncQueue configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Durable queue storage
    pub storage: StorageConfig,

    /// Sync behaviour (periodic timer, categories, retries)
    pub sync: SyncConfig,

    /// Remote endpoints
    pub endpoints: EndpointsConfig,

    /// Telemetry event log
    pub telemetry: TelemetryConfig,

    /// Host background-execution agent
    pub background: BackgroundConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.sync.validate()?;
        reqwest::Url::parse(&self.endpoints.base_url)
            .context(format!("Invalid endpoints base-url '{}'", self.endpoints.base_url))?;
        if self.background.agent == AgentKind::Command && self.background.command.is_none() {
            return Err(eyre::eyre!("background agent 'command' requires background.command"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .syncqueue.yml
        let local_config = PathBuf::from(".syncqueue.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/syncqueue/syncqueue.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("syncqueue").join("syncqueue.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database path (default: ~/.local/share/syncqueue/queue.db)
    #[serde(rename = "db-path")]
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| data_dir().join(queuestore::DEFAULT_DB_NAME))
    }
}

/// Sync behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Run the foreground periodic timer while online
    #[serde(rename = "enable-periodic-sync")]
    pub enable_periodic_sync: bool,

    /// Periodic timer interval in milliseconds
    #[serde(rename = "sync-interval-ms")]
    pub sync_interval_ms: u64,

    #[serde(rename = "enable-workout-sync")]
    pub enable_workout_sync: bool,

    #[serde(rename = "enable-nutrition-sync")]
    pub enable_nutrition_sync: bool,

    #[serde(rename = "enable-progress-sync")]
    pub enable_progress_sync: bool,

    #[serde(rename = "enable-chat-sync")]
    pub enable_chat_sync: bool,

    /// Default attempt ceiling for queued requests
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Minimum gap between attempts of the same request, in milliseconds
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enable_periodic_sync: true,
            sync_interval_ms: 300_000,
            enable_workout_sync: true,
            enable_nutrition_sync: true,
            enable_progress_sync: true,
            enable_chat_sync: true,
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval_ms == 0 {
            return Err(eyre::eyre!("sync-interval-ms must be greater than 0"));
        }
        if self.max_retries == 0 {
            return Err(eyre::eyre!("max-retries must be greater than 0"));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether background interest is registered for a category
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Workout => self.enable_workout_sync,
            Category::Nutrition => self.enable_nutrition_sync,
            Category::Progress => self.enable_progress_sync,
            Category::Chat => self.enable_chat_sync,
            Category::General => false,
        }
    }

    /// Categories with background sync enabled, in a stable order
    pub fn enabled_categories(&self) -> Vec<Category> {
        Category::syncable().into_iter().filter(|c| self.is_enabled(*c)).collect()
    }

    /// Background tags for the enabled categories
    pub fn enabled_tags(&self) -> BTreeSet<String> {
        self.enabled_categories().iter().map(Category::sync_tag).collect()
    }
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Base URL that relative targets are joined to
    #[serde(rename = "base-url")]
    pub base_url: String,

    pub workout: String,
    pub nutrition: String,
    pub progress: String,
    pub chat: String,

    /// Per-call timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            workout: "/api/sync/workout".to_string(),
            nutrition: "/api/sync/nutrition".to_string(),
            progress: "/api/sync/progress".to_string(),
            chat: "/api/sync/chat".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl EndpointsConfig {
    /// Sync endpoint for a record type
    pub fn path_for(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::Workout => &self.workout,
            RecordType::Nutrition => &self.nutrition,
            RecordType::Progress => &self.progress,
            RecordType::Chat => &self.chat,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,

    /// Event log path (default: ~/.local/share/syncqueue/telemetry.jsonl)
    #[serde(rename = "event-log")]
    pub event_log: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event_log: None,
        }
    }
}

impl TelemetryConfig {
    pub fn resolved_event_log(&self) -> PathBuf {
        self.event_log
            .clone()
            .unwrap_or_else(|| data_dir().join("telemetry.jsonl"))
    }
}

/// Which host background agent adapter to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Foreground polling only
    #[default]
    None,
    /// Run a host command per tag
    Command,
}

/// Host background-execution agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub agent: AgentKind,

    /// Program invoked with the tag as its last argument
    pub command: Option<String>,

    /// Arguments placed before the tag
    pub args: Vec<String>,
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("syncqueue")
}
