//! Task execution entry point.
//!
//! [`AcpClient::execute`] spawns a fresh agent process for every call, runs
//! the three protocol phases against it, and tears the process down exactly
//! once whatever the outcome. Nothing is shared between calls: the session,
//! the output accumulator, and the message counter all live inside one call.

use std::time::Duration;

use tracing::{info_span, Instrument};

use crate::acp::drain::DrainOptions;
use crate::acp::message::ClientInfo;
use crate::acp::session;
use crate::acp::stream::{collect_response, TaskOutput};
use crate::acp::transport::{AgentTransport, ProcessTransport, SpawnConfig};
use crate::config::ClientConfig;
use crate::Result;

/// One task to run against the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Working directory for the agent session.
    pub cwd: String,
    /// Natural-language task.
    pub task: String,
    /// Task window for the streaming phase.
    pub timeout: Duration,
    /// Optional model identifier, forwarded best-effort.
    pub model_id: Option<String>,
}

/// ACP client driving one task execution per call.
#[derive(Debug, Clone, Default)]
pub struct AcpClient {
    config: ClientConfig,
}

impl AcpClient {
    /// Create a client from validated configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawn the configured agent and execute `request` against it.
    ///
    /// # Errors
    ///
    /// - [`AppError::Connection`](crate::AppError::Connection) — the agent
    ///   could not be started or a pipe broke.
    /// - [`AppError::Protocol`](crate::AppError::Protocol) — the agent replied
    ///   with an error or never issued a session identifier.
    /// - [`AppError::Timeout`](crate::AppError::Timeout) — no end of turn
    ///   within `request.timeout`.
    pub async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput> {
        let transport = ProcessTransport::start(&SpawnConfig::from(&self.config))?;
        self.execute_on(transport, request).await
    }

    /// Execute `request` over an already started transport.
    ///
    /// The transport is shut down before this returns, on success and on
    /// every error.
    ///
    /// # Errors
    ///
    /// Same as [`AcpClient::execute`], minus spawn failures.
    pub async fn execute_on<T: AgentTransport>(
        &self,
        mut transport: T,
        request: &TaskRequest,
    ) -> Result<TaskOutput> {
        let span = info_span!("execute_task", cwd = request.cwd.as_str());

        let outcome = self
            .run_phases(&mut transport, request)
            .instrument(span.clone())
            .await;

        transport.shutdown().instrument(span).await;
        outcome
    }

    async fn run_phases<T: AgentTransport>(
        &self,
        transport: &mut T,
        request: &TaskRequest,
    ) -> Result<TaskOutput> {
        let handshake = DrainOptions {
            window: self.config.handshake_window(),
            poll_interval: self.config.poll_interval(),
            silent: true,
        };
        let client_info = ClientInfo {
            name: self.config.client_info.name.clone(),
            version: self.config.client_info.version.clone(),
        };

        session::initialize(
            transport,
            self.config.protocol_version,
            client_info,
            handshake,
        )
        .await?;

        let session_id = session::create_session(transport, &request.cwd, handshake).await?;

        session::submit_task(
            transport,
            &session_id,
            &request.task,
            request.model_id.as_deref(),
        )
        .await?;

        collect_response(transport, request.timeout)
            .instrument(info_span!("stream", session_id = session_id.as_str()))
            .await
    }
}
