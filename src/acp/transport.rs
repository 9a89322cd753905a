//! Agent process transport.
//!
//! [`ProcessTransport`] owns one spawned agent process and its three pipes
//! for the duration of a single task execution:
//! - stdin receives newline-terminated request lines, flushed immediately.
//! - stdout is framed by [`AcpCodec`] and read either with a bounded,
//!   readiness-driven wait ([`AgentTransport::poll_line`]) or a direct read
//!   ([`AgentTransport::read_line`]).
//! - stderr is drained continuously by a background task into a bounded tail
//!   (so a chatty agent never blocks on a full pipe) and that tail is
//!   reported at `DEBUG` once the process is gone.
//!
//! [`AgentTransport::shutdown`] consumes the transport, so a process can be
//! torn down at most once. `kill_on_drop(true)` is kept as a backstop for
//! paths that never reach the explicit shutdown (a panic or a dropped future).

use std::future::Future;
use std::io::ErrorKind;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::acp::codec::AcpCodec;
use crate::config::ClientConfig;
use crate::{AppError, Result};

/// Upper bound on the agent stderr kept for the shutdown report.
pub const STDERR_TAIL_BYTES: usize = 64 * 1024;

/// Boxed future returned by [`AgentTransport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Line-oriented duplex channel to an agent.
///
/// The protocol layer only talks to the agent through this trait, which keeps
/// it independent of how the agent process is hosted.
pub trait AgentTransport: Send + 'static {
    /// Write `line` followed by `\n` and flush.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connection`] if the pipe is closed or broken.
    fn write_line<'a>(&'a mut self, line: &'a str) -> TransportFuture<'a, Result<()>>;

    /// Wait up to `max_wait` for one line.
    ///
    /// Resolves to `Ok(None)` when the wait elapses with nothing ready or the
    /// stream has ended. Never resolves later than `max_wait`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connection`] on an I/O failure of the stream.
    fn poll_line(&mut self, max_wait: Duration) -> TransportFuture<'_, Result<Option<String>>>;

    /// Read one line without intermediate readiness polling.
    ///
    /// Resolves to `None` at end of stream and `Some(Err(_))` on a read fault.
    /// The caller bounds the wait.
    fn read_line(&mut self) -> TransportFuture<'_, Option<Result<String>>>;

    /// Close stdin, request termination, and force-kill after a grace period.
    fn shutdown(self) -> TransportFuture<'static, ()>
    where
        Self: Sized;
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Configuration for spawning an agent process.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Agent executable.
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Time allowed between the termination request and a forced kill.
    pub shutdown_grace: Duration,
}

impl From<&ClientConfig> for SpawnConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            program: config.agent.program.clone(),
            args: config.agent.args.clone(),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

// ── Process transport ────────────────────────────────────────────────────────

/// Transport over the stdio pipes of a spawned agent process.
#[derive(Debug)]
pub struct ProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: FramedRead<ChildStdout, AcpCodec>,
    stderr: Option<JoinHandle<String>>,
    shutdown_grace: Duration,
    /// `FramedRead` yields a single `None` right after a stream error.
    resume_after_error: bool,
    /// Stdout reached end of stream.
    closed: bool,
}

impl ProcessTransport {
    /// Spawn the agent with all three standard streams piped.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `AppError::Connection("<program> command not found")` — the
    ///   executable could not be located.
    /// - `AppError::Connection("failed to start process: …")` — any other
    ///   spawn failure, or a pipe could not be captured.
    pub fn start(config: &SpawnConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                AppError::Connection(format!("{} command not found", config.program))
            } else {
                AppError::Connection(format!("failed to start process: {err}"))
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Connection("failed to capture agent stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Connection("failed to capture agent stdout".into()))?;
        let stderr = child.stderr.take().map(collect_stderr);

        info!(
            program = config.program.as_str(),
            pid = child.id(),
            "agent process started"
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: FramedRead::new(stdout, AcpCodec::new()),
            stderr,
            shutdown_grace: config.shutdown_grace,
            resume_after_error: false,
            closed: false,
        })
    }

    /// Next framed item, skipping the pause `FramedRead` inserts after an error.
    async fn next_frame(&mut self) -> Option<std::io::Result<String>> {
        loop {
            match self.stdout.next().await {
                None if self.resume_after_error => self.resume_after_error = false,
                Some(Err(err)) => {
                    self.resume_after_error = true;
                    return Some(Err(err));
                }
                other => return other,
            }
        }
    }
}

impl AgentTransport for ProcessTransport {
    fn write_line<'a>(&'a mut self, line: &'a str) -> TransportFuture<'a, Result<()>> {
        Box::pin(async move {
            let stdin = self
                .stdin
                .as_mut()
                .ok_or_else(|| AppError::Connection("agent stdin is closed".into()))?;

            let mut bytes = Vec::with_capacity(line.len() + 1);
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');

            stdin
                .write_all(&bytes)
                .await
                .map_err(|err| AppError::Connection(format!("failed to send request: {err}")))?;
            stdin
                .flush()
                .await
                .map_err(|err| AppError::Connection(format!("failed to send request: {err}")))
        })
    }

    fn poll_line(&mut self, max_wait: Duration) -> TransportFuture<'_, Result<Option<String>>> {
        Box::pin(async move {
            if self.closed {
                // Nothing further can arrive; honour the wait so callers keep
                // their pacing instead of spinning.
                tokio::time::sleep(max_wait).await;
                return Ok(None);
            }

            match tokio::time::timeout(max_wait, self.next_frame()).await {
                Err(_elapsed) => Ok(None),
                Ok(None) => {
                    debug!("agent stdout reached end of stream");
                    self.closed = true;
                    Ok(None)
                }
                Ok(Some(Ok(line))) => Ok(Some(line)),
                Ok(Some(Err(err))) => Err(AppError::Connection(format!(
                    "failed to read from agent: {err}"
                ))),
            }
        })
    }

    fn read_line(&mut self) -> TransportFuture<'_, Option<Result<String>>> {
        Box::pin(async move {
            if self.closed {
                return None;
            }

            match self.next_frame().await {
                None => {
                    debug!("agent stdout reached end of stream");
                    self.closed = true;
                    None
                }
                Some(Ok(line)) => Some(Ok(line)),
                Some(Err(err)) => Some(Err(AppError::Connection(format!(
                    "failed to read from agent: {err}"
                )))),
            }
        })
    }

    fn shutdown(mut self) -> TransportFuture<'static, ()> {
        Box::pin(async move {
            // Closing stdin lets a well-behaved agent exit on its own.
            drop(self.stdin.take());
            request_termination(&mut self.child);

            match tokio::time::timeout(self.shutdown_grace, self.child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(%status, "agent process exited");
                }
                Ok(Err(err)) => {
                    warn!(%err, "error waiting for agent process");
                }
                Err(_) => {
                    warn!(
                        grace = ?self.shutdown_grace,
                        "agent did not exit within grace period, forcing kill"
                    );
                    if let Err(err) = self.child.kill().await {
                        warn!(%err, "failed to force-kill agent process");
                    }
                }
            }

            if let Some(collector) = self.stderr.take() {
                report_stderr(collector, self.shutdown_grace).await;
            }
        })
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // `None` once the child has been reaped.
    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };

    if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!(%err, pid, "failed to deliver SIGTERM to agent");
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        debug!(%err, "failed to request agent termination");
    }
}

/// Drain `stderr` until it closes, keeping only the last [`STDERR_TAIL_BYTES`].
fn collect_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut tail = Vec::new();
        let mut chunk = [0_u8; 8192];
        loop {
            match stderr.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    tail.extend_from_slice(&chunk[..n]);
                    if tail.len() > STDERR_TAIL_BYTES {
                        let excess = tail.len() - STDERR_TAIL_BYTES;
                        tail.drain(..excess);
                    }
                }
                Err(err) => {
                    debug!(%err, "failed to read agent stderr");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&tail).into_owned()
    })
}

/// Log the captured stderr tail, waiting at most `limit` for the pipe to close.
async fn report_stderr(mut collector: JoinHandle<String>, limit: Duration) {
    let captured = match tokio::time::timeout(limit, &mut collector).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(err)) => {
            debug!(%err, "agent stderr collector failed");
            return;
        }
        Err(_) => {
            collector.abort();
            debug!("agent stderr still open after shutdown");
            return;
        }
    };

    let captured = captured.trim();
    if !captured.is_empty() {
        debug!(stderr = captured, "agent diagnostics");
    }
}
