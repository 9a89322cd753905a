//! `/bin/sh` fake ACP agents for process-level tests.
//!
//! Each script receives the path of a request log as `$1`; `recv` appends the
//! next request line to it and `send` writes one reply line to stdout.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use acp_invoke::config::AgentConfig;
use acp_invoke::ClientConfig;

const PRELUDE: &str = r#"#!/bin/sh
LOG="$1"
recv() { IFS= read -r line; printf '%s\n' "$line" >> "$LOG"; }
send() { printf '%s\n' "$1"; }
"#;

/// Replies to `initialize` and `session/new`, issuing session `ses_123`.
pub const HANDSHAKE: &str = r#"
recv
send '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":1}}'
recv
send 'this is not json'
send '{"jsonrpc":"2.0","id":2,"result":{"sessionId":"ses_123"}}'
"#;

/// Streams `Hello world` in two chunks and ends the turn.
pub const STREAM_HELLO_WORLD: &str = r#"
recv
send '{"jsonrpc":"2.0","method":"session/update","params":{"update":{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":"Hello"}}}}'
send '{"jsonrpc":"2.0","method":"session/update","params":{"update":{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":" world"}}}}'
send '{"jsonrpc":"2.0","id":3,"result":{"stopReason":"end_turn"}}'
"#;

/// Keeps the process alive until it is terminated.
pub const LINGER: &str = "\nexec sleep 30\n";

pub struct FakeAgent {
    dir: TempDir,
    script: PathBuf,
    log: PathBuf,
}

impl FakeAgent {
    pub fn new(sections: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("agent.sh");
        let log = dir.path().join("requests.log");

        let mut body = PRELUDE.to_owned();
        for section in sections {
            body.push_str(section);
        }
        std::fs::write(&script, body).expect("write agent script");

        Self { dir, script, log }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Client configuration that launches this agent with short windows.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            agent: AgentConfig {
                program: "sh".into(),
                args: vec![
                    self.script.to_string_lossy().into_owned(),
                    self.log.to_string_lossy().into_owned(),
                ],
            },
            handshake_window_ms: 300,
            poll_interval_ms: 20,
            shutdown_grace_ms: 300,
            ..ClientConfig::default()
        }
    }

    /// The same configuration as a TOML file for the CLI.
    pub fn config_file(&self) -> PathBuf {
        let path = self.dir.path().join("acp.toml");
        let toml = format!(
            r#"
handshake_window_ms = 300
poll_interval_ms = 20
shutdown_grace_ms = 300

[agent]
program = "sh"
args = ['{script}', '{log}']
"#,
            script = self.script.display(),
            log = self.log.display(),
        );
        std::fs::write(&path, toml).expect("write config");
        path
    }

    /// Requests received by the agent, in order.
    pub fn requests(&self) -> Vec<Value> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("request is valid JSON"))
            .collect()
    }
}
