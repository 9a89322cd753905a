//! Three-phase session protocol.
//!
//! 1. **`initialize`** (id 1) — declares the protocol version and client
//!    identity. Replies are drained and error-checked, then discarded.
//! 2. **`session/new`** (id 2) — opens a session rooted at the working
//!    directory. The first drained result carrying `sessionId` wins.
//! 3. **`session/prompt`** (id 3) — submits the task. Streaming replies are
//!    handled by [`crate::acp::stream`].
//!
//! Each phase only starts once the previous one has completed without error.

use serde_json::Map;
use tracing::info;

use crate::acp::dispatch::send_request;
use crate::acp::drain::{drain, DrainOptions};
use crate::acp::message::{
    ClientInfo, InitializeParams, NewSessionParams, PromptContent, PromptParams,
};
use crate::acp::transport::AgentTransport;
use crate::{AppError, Result};

/// Request id of the `initialize` phase.
pub const INITIALIZE_ID: u64 = 1;
/// Request id of the `session/new` phase.
pub const NEW_SESSION_ID: u64 = 2;
/// Request id of the `session/prompt` phase.
pub const PROMPT_ID: u64 = 3;

/// Method name of phase 1.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Method name of phase 2.
pub const METHOD_SESSION_NEW: &str = "session/new";
/// Method name of phase 3.
pub const METHOD_SESSION_PROMPT: &str = "session/prompt";

/// Run the `initialize` phase.
///
/// # Errors
///
/// - [`AppError::Connection`] if the request cannot be written.
/// - [`AppError::Protocol`] if the agent replies with an error.
pub async fn initialize<T: AgentTransport>(
    transport: &mut T,
    protocol_version: u32,
    client_info: ClientInfo,
    drain_options: DrainOptions,
) -> Result<()> {
    let params = InitializeParams {
        protocol_version,
        capabilities: Map::new(),
        client_info,
    };

    send_request(transport, INITIALIZE_ID, METHOD_INITIALIZE, &params).await?;
    drain(transport, drain_options).await?;
    Ok(())
}

/// Run the `session/new` phase and return the issued session identifier.
///
/// # Errors
///
/// - [`AppError::Connection`] if the request cannot be written.
/// - [`AppError::Protocol`] if the agent replies with an error, or with code
///   [`SESSION_NOT_CREATED_CODE`](crate::errors::SESSION_NOT_CREATED_CODE)
///   when no `sessionId` arrives within the window.
pub async fn create_session<T: AgentTransport>(
    transport: &mut T,
    cwd: &str,
    drain_options: DrainOptions,
) -> Result<String> {
    let params = NewSessionParams {
        cwd: cwd.to_owned(),
        mcp_servers: Vec::new(),
    };

    send_request(transport, NEW_SESSION_ID, METHOD_SESSION_NEW, &params).await?;
    let messages = drain(transport, drain_options).await?;

    let session_id = messages
        .iter()
        .find_map(|message| message.session_id())
        .ok_or_else(AppError::session_not_created)?
        .to_owned();

    info!(session_id = session_id.as_str(), "session created");
    Ok(session_id)
}

/// Send the `session/prompt` request for `task`.
///
/// `model_id` is forwarded as `modelId` when present and non-empty, and
/// omitted otherwise.
///
/// # Errors
///
/// Returns [`AppError::Connection`] if the request cannot be written.
pub async fn submit_task<T: AgentTransport>(
    transport: &mut T,
    session_id: &str,
    task: &str,
    model_id: Option<&str>,
) -> Result<()> {
    let params = PromptParams {
        session_id: session_id.to_owned(),
        prompt: vec![PromptContent::Text {
            text: task.to_owned(),
        }],
        model_id: model_id.filter(|id| !id.is_empty()).map(str::to_owned),
    };

    info!(session_id, "executing task");
    send_request(transport, PROMPT_ID, METHOD_SESSION_PROMPT, &params).await
}
