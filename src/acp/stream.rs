//! Streamed response aggregation and completion detection.
//!
//! After `session/prompt` is sent, the agent streams `session/update`
//! notifications and finally answers the prompt request with a result whose
//! `stopReason` is `end_turn`. [`collect_response`] reads until that signal,
//! concatenating every `agent_message_chunk` text fragment in arrival order.
//!
//! | Inbound message                         | Effect                               |
//! |-----------------------------------------|--------------------------------------|
//! | any parsed message                      | message count + 1                    |
//! | `session/update` + `agent_message_chunk`| text appended to the output          |
//! | result with `stopReason: end_turn`      | loop ends, [`Completion::EndTurn`]   |
//! | error message                           | [`AppError::Protocol`]               |
//! | unparseable or blank line               | skipped, not counted                 |

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::acp::message::InboundMessage;
use crate::acp::transport::AgentTransport;
use crate::{AppError, Result};

/// How the streaming loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The agent reported `stopReason: end_turn`.
    EndTurn,
    /// The agent's stdout ended or failed before the end of turn. The output
    /// holds whatever arrived until then.
    StreamClosed,
}

/// Result of one task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// Concatenated text fragments, in arrival order.
    pub text: String,
    /// Number of parsed messages observed while streaming.
    pub message_count: usize,
    /// How the stream ended.
    pub completion: Completion,
}

impl TaskOutput {
    /// Whether the agent finished its turn.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::EndTurn
    }
}

/// Append-only accumulator for one streaming phase.
#[derive(Debug, Default)]
pub struct ResponseAggregator {
    fragments: Vec<String>,
    message_count: usize,
}

impl ResponseAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one parsed message. Returns `true` on the end-of-turn signal.
    pub fn record(&mut self, message: &InboundMessage) -> bool {
        self.message_count += 1;

        if let Some(text) = message.text_chunk() {
            self.fragments.push(text.to_owned());
        }

        message.is_end_turn()
    }

    /// Number of messages recorded so far.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// Assemble the final output.
    #[must_use]
    pub fn finish(self, completion: Completion) -> TaskOutput {
        TaskOutput {
            text: self.fragments.concat(),
            message_count: self.message_count,
            completion,
        }
    }
}

/// Read streamed replies until the end of turn or until `window` elapses.
///
/// The window is measured from the call. It is checked before every read and
/// also bounds each read, so a silent agent cannot hold the loop past it.
///
/// # Errors
///
/// - [`AppError::Timeout`] carrying `window` if no end-of-turn signal arrives
///   in time.
/// - [`AppError::Protocol`] if the agent sends an error message.
pub async fn collect_response<T: AgentTransport>(
    transport: &mut T,
    window: Duration,
) -> Result<TaskOutput> {
    let deadline = Instant::now() + window;
    let mut aggregator = ResponseAggregator::new();

    let completion = loop {
        if Instant::now() >= deadline {
            return Err(AppError::Timeout(window));
        }

        let line = match tokio::time::timeout_at(deadline, transport.read_line()).await {
            Err(_elapsed) => return Err(AppError::Timeout(window)),
            Ok(None) => {
                warn!(
                    count = aggregator.message_count(),
                    "agent stream closed before end of turn"
                );
                break Completion::StreamClosed;
            }
            Ok(Some(Err(err))) => {
                warn!(%err, count = aggregator.message_count(), "agent stream interrupted");
                break Completion::StreamClosed;
            }
            Ok(Some(Ok(line))) => line,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(line = trimmed, "<<< response");

        let message = InboundMessage::parse(trimmed);
        match message {
            InboundMessage::Unparseable { reason } => {
                debug!(%reason, raw = trimmed, "skipping invalid JSON line");
            }
            InboundMessage::Error(err) => return Err(err.into()),
            message => {
                if aggregator.record(&message) {
                    break Completion::EndTurn;
                }
            }
        }
    };

    let output = aggregator.finish(completion);
    info!(
        count = output.message_count,
        complete = output.is_complete(),
        "task finished"
    );
    Ok(output)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
