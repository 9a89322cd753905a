//! Outbound request dispatch.

use serde::Serialize;
use tracing::debug;

use crate::acp::message::RpcRequest;
use crate::acp::transport::AgentTransport;
use crate::{AppError, Result};

/// Serialise one request envelope to a single JSON line and write it.
///
/// One write attempt per call; failures are not retried.
///
/// # Errors
///
/// Returns [`AppError::Connection`] if serialisation fails or the transport
/// rejects the write.
pub async fn send_request<T, P>(transport: &mut T, id: u64, method: &str, params: &P) -> Result<()>
where
    T: AgentTransport,
    P: Serialize,
{
    let line = serde_json::to_string(&RpcRequest::new(id, method, params))
        .map_err(|err| AppError::Connection(format!("failed to serialise request: {err}")))?;

    debug!(id, method, line = line.as_str(), ">>> request");
    transport.write_line(&line).await
}
