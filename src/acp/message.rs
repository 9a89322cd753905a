//! JSON-RPC message shapes exchanged with the agent.
//!
//! Outbound requests are typed structs serialised into the canonical
//! `{"jsonrpc":"2.0","id",…}` envelope. Inbound lines are classified once,
//! at the decode boundary, into an [`InboundMessage`]; deciding whether an
//! error variant is fatal is left to the phase that observes it.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::AppError;

/// JSON-RPC protocol version tag carried by every outbound request.
pub const JSONRPC_VERSION: &str = "2.0";

/// `sessionUpdate` kind of a streamed text fragment.
pub const AGENT_MESSAGE_CHUNK: &str = "agent_message_chunk";

/// Stop reason that marks the end of the agent's turn.
pub const END_TURN: &str = "end_turn";

/// Notification method carrying streamed session updates.
pub const SESSION_UPDATE: &str = "session/update";

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Canonical request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: u64,
    /// Method name.
    pub method: &'a str,
    /// Method-specific parameters.
    pub params: &'a P,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    /// Build an envelope with the fixed protocol version tag.
    #[must_use]
    pub fn new(id: u64, method: &'a str, params: &'a P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// Client identity declared during `initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version number understood by the client.
    pub protocol_version: u32,
    /// Client capabilities; always an empty object.
    pub capabilities: Map<String, Value>,
    /// Client identity.
    pub client_info: ClientInfo,
}

/// Parameters of the `session/new` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionParams {
    /// Working directory the agent operates in.
    pub cwd: String,
    /// Auxiliary MCP servers; always empty.
    pub mcp_servers: Vec<Value>,
}

/// One entry of a prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptContent {
    /// Plain text prompt entry.
    Text {
        /// Prompt text.
        text: String,
    },
}

/// Parameters of the `session/prompt` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParams {
    /// Session identifier issued by the agent.
    pub session_id: String,
    /// Prompt entries; a single text entry holding the task.
    pub prompt: Vec<PromptContent>,
    /// Requested model, forwarded best-effort. Omitted when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Error object carried by an inbound error message.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// Error code; `-1` when the agent omitted it.
    pub code: i64,
    /// Error message; `"Unknown error"` when the agent omitted it.
    pub message: String,
    /// Optional structured payload.
    pub data: Option<Value>,
}

impl RpcError {
    fn from_value(error: &Value) -> Self {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = match error {
            Value::String(text) => text.clone(),
            _ => error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_owned(),
        };
        let data = error.get("data").filter(|data| !data.is_null()).cloned();
        Self {
            code,
            message,
            data,
        }
    }
}

impl From<RpcError> for AppError {
    fn from(err: RpcError) -> Self {
        Self::Protocol {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// One inbound line, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A response carrying `result`.
    Result {
        /// Correlation identifier, if present.
        id: Option<Value>,
        /// Result payload.
        result: Value,
    },
    /// Any message carrying an `error` member.
    Error(RpcError),
    /// A message with `method` and no `result`.
    Notification {
        /// Notification method.
        method: String,
        /// Notification parameters (`null` when absent).
        params: Value,
    },
    /// Valid JSON that matches none of the shapes above.
    Other(Value),
    /// The line was not valid JSON.
    Unparseable {
        /// Parser diagnostic.
        reason: String,
    },
}

impl InboundMessage {
    /// Classify one raw line.
    ///
    /// Never fails: a line that does not parse becomes
    /// [`InboundMessage::Unparseable`].
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match serde_json::from_str::<Value>(line.trim()) {
            Ok(value) => Self::classify(value),
            Err(err) => Self::Unparseable {
                reason: err.to_string(),
            },
        }
    }

    /// Classify an already parsed JSON value.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Self::Other(other),
        };

        // `"error": null` alongside a result is not an error.
        if let Some(error) = object.get("error").filter(|error| !error.is_null()) {
            return Self::Error(RpcError::from_value(error));
        }

        if let Some(result) = object.remove("result") {
            return Self::Result {
                id: object.remove("id"),
                result,
            };
        }

        if let Some(Value::String(method)) = object.remove("method") {
            return Self::Notification {
                method,
                params: object.remove("params").unwrap_or(Value::Null),
            };
        }

        Self::Other(Value::Object(object))
    }

    /// Whether the line parsed as JSON.
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        !matches!(self, Self::Unparseable { .. })
    }

    /// Session identifier from a `session/new` result.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Result { result, .. } => result.get("sessionId").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Stop reason from a `session/prompt` result.
    #[must_use]
    pub fn stop_reason(&self) -> Option<&str> {
        match self {
            Self::Result { result, .. } => result.get("stopReason").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Whether this message signals the end of the agent's turn.
    #[must_use]
    pub fn is_end_turn(&self) -> bool {
        self.stop_reason() == Some(END_TURN)
    }

    /// Text of a streamed `agent_message_chunk` update.
    ///
    /// Other update kinds and non-text content yield `None`. A text chunk
    /// without a `text` member yields an empty fragment.
    #[must_use]
    pub fn text_chunk(&self) -> Option<&str> {
        let Self::Notification { method, params } = self else {
            return None;
        };
        if method != SESSION_UPDATE {
            return None;
        }

        let update = params.get("update")?;
        if update.get("sessionUpdate").and_then(Value::as_str) != Some(AGENT_MESSAGE_CHUNK) {
            return None;
        }

        let content = update.get("content")?;
        if content.get("type").and_then(Value::as_str) != Some("text") {
            return None;
        }

        Some(content.get("text").and_then(Value::as_str).unwrap_or(""))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
