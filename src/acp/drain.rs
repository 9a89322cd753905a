//! Timed response draining for the handshake phases.
//!
//! [`drain`] keeps reading for the whole window, even after the expected
//! reply has arrived, and aborts the moment any error-shaped message is seen.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::acp::message::InboundMessage;
use crate::acp::transport::AgentTransport;
use crate::Result;

/// Tuning for one drain pass.
#[derive(Debug, Clone, Copy)]
pub struct DrainOptions {
    /// Total time spent draining.
    pub window: Duration,
    /// Upper bound of a single readiness wait; the window deadline is
    /// re-checked after every tick.
    pub poll_interval: Duration,
    /// Suppress per-line logging. Has no effect on error handling.
    pub silent: bool,
}

/// Collect every parsed message that arrives within `options.window`.
///
/// Unparseable lines are skipped. Messages are returned in arrival order.
///
/// # Errors
///
/// - [`AppError::Protocol`](crate::AppError::Protocol) carrying the agent's
///   code, message, and data as soon as an error message is read.
/// - [`AppError::Connection`](crate::AppError::Connection) if the transport
///   fails.
pub async fn drain<T: AgentTransport>(
    transport: &mut T,
    options: DrainOptions,
) -> Result<Vec<InboundMessage>> {
    let deadline = Instant::now() + options.window;
    let mut messages = Vec::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let Some(line) = transport
            .poll_line(remaining.min(options.poll_interval))
            .await?
        else {
            continue;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if options.silent {
            trace!(line = trimmed, "<<< response");
        } else {
            debug!(line = trimmed, "<<< response");
        }

        match InboundMessage::parse(trimmed) {
            InboundMessage::Error(err) => return Err(err.into()),
            InboundMessage::Unparseable { reason } => {
                if options.silent {
                    debug!(%reason, raw = trimmed, "skipping invalid JSON line");
                } else {
                    warn!(%reason, raw = trimmed, "skipping invalid JSON line");
                }
            }
            message => messages.push(message),
        }
    }

    Ok(messages)
}
