//! Error types shared across the client.
//!
//! Every failure of a task execution is exactly one of three kinds:
//! [`AppError::Connection`], [`AppError::Protocol`], or [`AppError::Timeout`].
//! [`AppError::Config`] only arises while loading configuration, before any
//! agent process exists.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde_json::Value;

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Synthetic protocol error code used when the agent never issues a session
/// identifier during the `session/new` handshake.
///
/// Remote JSON-RPC errors use the reserved negative range below `-32000`, so
/// this value never collides with a code sent by the agent for that phase.
pub const SESSION_NOT_CREATED_CODE: i64 = -1;

/// Client error enumeration covering all failure modes of a task execution.
#[derive(Debug)]
pub enum AppError {
    /// The agent executable is missing, could not be spawned, or a pipe broke.
    Connection(String),
    /// The agent replied with a JSON-RPC error, or a local protocol invariant
    /// (such as a missing session identifier) was violated.
    Protocol {
        /// JSON-RPC error code.
        code: i64,
        /// Human-readable error message.
        message: String,
        /// Optional structured error payload sent by the agent.
        data: Option<Value>,
    },
    /// The configured window elapsed before the required condition was met.
    Timeout(Duration),
    /// Configuration parsing or validation failure.
    Config(String),
}

impl AppError {
    /// Build the local "no session identifier" protocol failure.
    #[must_use]
    pub fn session_not_created() -> Self {
        Self::Protocol {
            code: SESSION_NOT_CREATED_CODE,
            message: "failed to create session".into(),
            data: None,
        }
    }

    /// Process exit code used by the command-line entry point for this kind.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Timeout(_) => 2,
            Self::Protocol { .. } => 3,
            Self::Connection(_) => 4,
            Self::Config(_) => 5,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection: {msg}"),
            Self::Protocol { code, message, .. } => write!(f, "protocol: [{code}] {message}"),
            Self::Timeout(window) => {
                write!(f, "timeout: task timeout after {}s", window.as_secs_f64())
            }
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
