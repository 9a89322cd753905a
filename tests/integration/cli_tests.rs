//! Exit-code and output tests for the `acp-invoke` binary.

use std::process::{Command, Output};

use super::fake_agent::{FakeAgent, HANDSHAKE, LINGER, STREAM_HELLO_WORLD};

fn run(agent: &FakeAgent, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_acp-invoke"))
        .arg("--config")
        .arg(agent.config_file())
        .args(extra)
        .arg(agent.dir())
        .arg("Say hello")
        .env("RUST_LOG", "warn")
        .output()
        .expect("binary runs")
}

#[test]
fn success_prints_final_output() {
    let agent = FakeAgent::new(&[HANDSHAKE, STREAM_HELLO_WORLD, LINGER]);
    let out_file = agent.dir().join("answer.txt");

    let output = run(&agent, &["-o", out_file.to_str().expect("utf8 path")]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Final Output ==="));
    assert!(stdout.contains("Hello world"));
    assert_eq!(
        std::fs::read_to_string(&out_file).expect("output file written"),
        "Hello world"
    );
}

#[test]
fn quiet_success_prints_nothing() {
    let agent = FakeAgent::new(&[HANDSHAKE, STREAM_HELLO_WORLD, LINGER]);

    let output = run(&agent, &["-q"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn quiet_wins_over_verbose() {
    let agent = FakeAgent::new(&[HANDSHAKE, STREAM_HELLO_WORLD, LINGER]);

    let output = Command::new(env!("CARGO_BIN_EXE_acp-invoke"))
        .arg("--config")
        .arg(agent.config_file())
        .args(["-q", "-v"])
        .arg(agent.dir())
        .arg("Say hello")
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs");

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());
    assert!(
        !String::from_utf8_lossy(&output.stderr).contains(">>> request"),
        "protocol traffic is not logged when quiet"
    );
}

#[test]
fn timeout_exits_with_code_2() {
    let agent = FakeAgent::new(&[HANDSHAKE, "\nrecv\n", LINGER]);

    let output = run(&agent, &["-t", "0.3"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("task timeout after 0.3s"));
}

#[test]
fn remote_error_exits_with_code_3() {
    let agent = FakeAgent::new(&[
        r#"
recv
send '{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid params"}}'
"#,
        LINGER,
    ]);

    let output = run(&agent, &[]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[-32602] Invalid params"));
}

#[test]
fn closed_stream_exits_with_code_4() {
    let agent = FakeAgent::new(&[HANDSHAKE, "\nrecv\nexit 0\n"]);

    let output = run(&agent, &[]);

    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty(), "partial output is never reported");
}

#[test]
fn invalid_config_exits_with_code_5() {
    let agent = FakeAgent::new(&[LINGER]);
    let config = agent.dir().join("bad.toml");
    std::fs::write(&config, "handshake_window_ms = 0\n").expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_acp-invoke"))
        .arg("--config")
        .arg(&config)
        .arg(agent.dir())
        .arg("task")
        .output()
        .expect("binary runs");

    assert_eq!(output.status.code(), Some(5));
}
