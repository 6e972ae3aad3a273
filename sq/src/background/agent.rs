//! Host background-execution agent adapters

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{AgentKind, BackgroundConfig};

/// Errors from registering a background interest
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The host has no background-execution facility
    #[error("Background sync not supported by host")]
    Unsupported,

    #[error("Host rejected registration of '{tag}': {reason}")]
    Rejected { tag: String, reason: String },

    #[error("Failed to reach host agent: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistrationError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, RegistrationError::Unsupported)
    }
}

/// Capability interface over the host background-execution agent
///
/// The host is asked to remember one named interest per tag and to wake
/// the application for it later. How the wake-up is routed back is the
/// host's business.
#[async_trait]
pub trait BackgroundAgent: Send + Sync {
    /// Adapter name for logs and status output
    fn name(&self) -> &'static str;

    async fn register(&self, tag: &str) -> Result<(), RegistrationError>;
}

/// Polling-only adapter: reports every registration as unsupported
#[derive(Debug, Default)]
pub struct NoopAgent;

#[async_trait]
impl BackgroundAgent for NoopAgent {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn register(&self, tag: &str) -> Result<(), RegistrationError> {
        debug!(%tag, "NoopAgent::register: unsupported");
        Err(RegistrationError::Unsupported)
    }
}

/// Host-backed adapter that runs a command per tag
///
/// The tag is appended as the last argument. A non-zero exit is a rejection.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl BackgroundAgent for CommandAgent {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn register(&self, tag: &str) -> Result<(), RegistrationError> {
        debug!(program = %self.program, %tag, "CommandAgent::register: called");
        let output = Command::new(&self.program).args(&self.args).arg(tag).output().await?;

        if output.status.success() {
            return Ok(());
        }

        let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if reason.is_empty() {
            format!("exit status {}", output.status)
        } else {
            reason
        };
        warn!(%tag, %reason, "Host agent rejected registration");
        Err(RegistrationError::Rejected {
            tag: tag.to_string(),
            reason,
        })
    }
}

/// Build the adapter selected by configuration
pub fn agent_from_config(config: &BackgroundConfig) -> Arc<dyn BackgroundAgent> {
    match (config.agent, &config.command) {
        (AgentKind::Command, Some(program)) => Arc::new(CommandAgent::new(program.clone(), config.args.clone())),
        (AgentKind::Command, None) => {
            warn!("Command agent configured without a command, falling back to polling only");
            Arc::new(NoopAgent)
        }
        (AgentKind::None, _) => Arc::new(NoopAgent),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_agent_is_unsupported() {
        let err = NoopAgent.register("sync-workout").await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_agent_success() {
        let agent = CommandAgent::new("true", vec![]);
        assert!(agent.register("sync-chat").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_agent_nonzero_exit_is_rejection() {
        let agent = CommandAgent::new("false", vec![]);
        let err = agent.register("sync-chat").await.unwrap_err();
        assert!(matches!(err, RegistrationError::Rejected { ref tag, .. } if tag == "sync-chat"));
    }

    #[tokio::test]
    async fn test_command_agent_missing_program_is_io_error() {
        let agent = CommandAgent::new("/definitely/not/a/registrar", vec![]);
        let err = agent.register("sync-workout").await.unwrap_err();
        assert!(matches!(err, RegistrationError::Io(_)));
    }

    #[test]
    fn test_agent_from_config() {
        let config = BackgroundConfig::default();
        assert_eq!(agent_from_config(&config).name(), "none");

        let config = BackgroundConfig {
            agent: AgentKind::Command,
            command: Some("register-sync".to_string()),
            args: vec![],
        };
        assert_eq!(agent_from_config(&config).name(), "command");

        let config = BackgroundConfig {
            agent: AgentKind::Command,
            command: None,
            args: vec![],
        };
        assert_eq!(agent_from_config(&config).name(), "none");
    }
}
