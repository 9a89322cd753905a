//! Agent Client Protocol (ACP) over an agent process's stdio.
//!
//! Messages are JSON-RPC 2.0 objects, one per line, in both directions.
//!
//! Submodules, leaves first:
//! - `codec`: line framing with a maximum line length.
//! - `message`: outbound request shapes and inbound classification.
//! - `transport`: process ownership, line I/O, and teardown.
//! - `dispatch`: request envelope serialisation.
//! - `drain`: timed draining of handshake replies.
//! - `session`: the `initialize` / `session/new` / `session/prompt` phases.
//! - `stream`: chunk aggregation and end-of-turn detection.

pub mod codec;
pub mod dispatch;
pub mod drain;
pub mod message;
pub mod session;
pub mod stream;
pub mod transport;
