//! Client configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Agent executable launched for each task execution.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Executable name or path (e.g., `opencode`).
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments that put the executable into ACP stdio mode.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

/// Identity announced to the agent in the `initialize` request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientInfoConfig {
    /// Client name.
    #[serde(default = "default_client_name")]
    pub name: String,
    /// Client version string.
    #[serde(default = "default_client_version")]
    pub version: String,
}

impl Default for ClientInfoConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            version: default_client_version(),
        }
    }
}

fn default_program() -> String {
    "opencode".into()
}

fn default_args() -> Vec<String> {
    vec!["acp".into()]
}

fn default_client_name() -> String {
    "claude-code".into()
}

fn default_client_version() -> String {
    "1.0".into()
}

fn default_handshake_window_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

fn default_task_timeout_seconds() -> u64 {
    120
}

fn default_protocol_version() -> u32 {
    1
}

/// Client configuration parsed from an optional TOML file.
///
/// Every key has a default, so an empty document is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Agent executable settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Drain window applied to the `initialize` and `session/new` phases.
    #[serde(default = "default_handshake_window_ms")]
    pub handshake_window_ms: u64,
    /// Readiness tick of the handshake drain.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Grace period between the termination request and a forced kill.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Task window used when the caller does not supply one.
    #[serde(default = "default_task_timeout_seconds")]
    pub task_timeout_seconds: u64,
    /// Protocol version number declared in `initialize`.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,
    /// Client identity declared in `initialize`.
    #[serde(default)]
    pub client_info: ClientInfoConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            handshake_window_ms: default_handshake_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            task_timeout_seconds: default_task_timeout_seconds(),
            protocol_version: default_protocol_version(),
            client_info: ClientInfoConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Handshake drain window.
    #[must_use]
    pub fn handshake_window(&self) -> Duration {
        Duration::from_millis(self.handshake_window_ms)
    }

    /// Readiness tick of the handshake drain.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Default task window.
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_seconds)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.agent.program.trim().is_empty() {
            return Err(AppError::Config("agent.program must not be empty".into()));
        }

        if self.handshake_window_ms == 0 {
            return Err(AppError::Config(
                "handshake_window_ms must be greater than zero".into(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }

        if self.poll_interval_ms > self.handshake_window_ms {
            return Err(AppError::Config(
                "poll_interval_ms must not exceed handshake_window_ms".into(),
            ));
        }

        if self.task_timeout_seconds == 0 {
            return Err(AppError::Config(
                "task_timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
