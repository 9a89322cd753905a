//! Full task executions against real `/bin/sh` agent processes.

use std::time::{Duration, Instant};

use acp_invoke::config::AgentConfig;
use acp_invoke::{AcpClient, AppError, ClientConfig, Completion, TaskRequest};

use super::fake_agent::{FakeAgent, HANDSHAKE, LINGER, STREAM_HELLO_WORLD};

fn request(cwd: &str, timeout: Duration) -> TaskRequest {
    TaskRequest {
        cwd: cwd.to_owned(),
        task: "Say hello".into(),
        timeout,
        model_id: None,
    }
}

#[tokio::test]
async fn streams_output_from_agent_process() {
    let agent = FakeAgent::new(&[HANDSHAKE, STREAM_HELLO_WORLD, LINGER]);
    let cwd = agent.dir().to_string_lossy().into_owned();

    let output = AcpClient::new(agent.config())
        .execute(&request(&cwd, Duration::from_secs(10)))
        .await
        .expect("task succeeds");

    assert_eq!(output.text, "Hello world");
    assert_eq!(output.message_count, 3);
    assert_eq!(output.completion, Completion::EndTurn);

    let requests = agent.requests();
    let ids: Vec<u64> = requests.iter().filter_map(|r| r["id"].as_u64()).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(requests[1]["params"]["cwd"], cwd.as_str());
    assert_eq!(requests[2]["params"]["sessionId"], "ses_123");
}

#[tokio::test]
async fn missing_agent_is_connection_error() {
    let config = ClientConfig {
        agent: AgentConfig {
            program: "acp-invoke-no-such-agent".into(),
            args: vec!["acp".into()],
        },
        ..ClientConfig::default()
    };

    let result = AcpClient::new(config)
        .execute(&request("/tmp", Duration::from_secs(1)))
        .await;

    assert!(matches!(result, Err(AppError::Connection(msg)) if msg.contains("command not found")));
}

#[tokio::test]
async fn silent_agent_times_out() {
    let agent = FakeAgent::new(&[HANDSHAKE, "\nrecv\n", LINGER]);

    let started = Instant::now();
    let result = AcpClient::new(agent.config())
        .execute(&request("/tmp", Duration::from_millis(400)))
        .await;

    assert!(matches!(result, Err(AppError::Timeout(window)) if window == Duration::from_millis(400)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn agent_without_session_id_fails() {
    let agent = FakeAgent::new(&[
        r#"
recv
send '{"jsonrpc":"2.0","id":1,"result":{}}'
recv
send '{"jsonrpc":"2.0","id":2,"result":{}}'
"#,
        LINGER,
    ]);

    let result = AcpClient::new(agent.config())
        .execute(&request("/tmp", Duration::from_secs(5)))
        .await;

    assert!(matches!(
        result,
        Err(AppError::Protocol { code: -1, ref message, .. }) if message == "failed to create session"
    ));
    assert_eq!(agent.requests().len(), 2);
}

#[tokio::test]
async fn agent_exit_mid_stream_returns_partial_output() {
    let agent = FakeAgent::new(&[
        HANDSHAKE,
        r#"
recv
send '{"jsonrpc":"2.0","method":"session/update","params":{"update":{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":"partial"}}}}'
exit 0
"#,
    ]);

    let output = AcpClient::new(agent.config())
        .execute(&request("/tmp", Duration::from_secs(10)))
        .await
        .expect("stream closure is not raised");

    assert_eq!(output.text, "partial");
    assert_eq!(output.completion, Completion::StreamClosed);
}

#[tokio::test]
async fn oversized_message_is_dropped_and_turn_still_completes() {
    let agent = FakeAgent::new(&[
        HANDSHAKE,
        r#"
recv
printf '%s' '{"jsonrpc":"2.0","method":"session/update","params":{"update":{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":"'
head -c 1100000 /dev/zero | tr '\0' x
printf '%s\n' '"}}}}'
send '{"jsonrpc":"2.0","method":"session/update","params":{"update":{"sessionUpdate":"agent_message_chunk","content":{"type":"text","text":"tail"}}}}'
send '{"jsonrpc":"2.0","id":3,"result":{"stopReason":"end_turn"}}'
"#,
        LINGER,
    ]);

    let output = AcpClient::new(agent.config())
        .execute(&request("/tmp", Duration::from_secs(5)))
        .await
        .expect("task completes");

    assert_eq!(output.completion, Completion::EndTurn);
    assert_eq!(output.text, "tail");
    assert_eq!(output.message_count, 2);
}
