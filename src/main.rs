#![forbid(unsafe_code)]

//! `acp-invoke` — run one task through an ACP agent and print its answer.
//!
//! Exit codes: `0` success, `2` timeout, `3` protocol error, `4` connection
//! error (including a stream that closed before the end of turn), `5`
//! configuration or output-file failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use acp_invoke::{AcpClient, AppError, ClientConfig, Result, TaskOutput, TaskRequest};

/// Exit code for failures outside the protocol taxonomy.
const UNEXPECTED_EXIT: u8 = 5;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "acp-invoke",
    about = "Run a task through an ACP agent process",
    version,
    long_about = None
)]
struct Cli {
    /// Working directory for the agent session.
    cwd: String,

    /// Task description.
    task: String,

    /// Suppress output (only errors). Takes precedence over `--verbose`.
    #[arg(short, long)]
    quiet: bool,

    /// Show all protocol traffic.
    #[arg(short, long)]
    verbose: bool,

    /// Task timeout in seconds (defaults to the configured value).
    #[arg(short, long, value_parser = parse_seconds)]
    timeout: Option<Duration>,

    /// Save the final output to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model identifier forwarded to the agent.
    #[arg(short, long)]
    model: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(&args) {
        eprintln!("✗ {err}");
        return ExitCode::from(err.exit_code());
    }

    let output = match run(&args) {
        Ok(output) => output,
        Err(err) => {
            error!(%err, "task failed");
            eprintln!("✗ {err}");
            return ExitCode::from(err.exit_code());
        }
    };

    if let Some(path) = &args.output {
        if let Err(err) = std::fs::write(path, &output.text) {
            eprintln!("✗ failed to write {}: {err}", path.display());
            return ExitCode::from(UNEXPECTED_EXIT);
        }
        if !args.quiet {
            println!("✓ Output saved to {}", path.display());
        }
    }

    if !output.text.is_empty() && !args.quiet {
        println!("\n=== Final Output ===");
        println!("{}", output.text);
    }

    ExitCode::SUCCESS
}

fn run(args: &Cli) -> Result<TaskOutput> {
    let config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };

    let request = TaskRequest {
        cwd: args.cwd.clone(),
        task: args.task.clone(),
        timeout: args.timeout.unwrap_or_else(|| config.task_timeout()),
        model_id: args.model.clone(),
    };
    let client = AcpClient::new(config);

    let output = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(client.execute(&request))?;

    // Partial output is never reported as success.
    if !output.is_complete() {
        return Err(AppError::Connection(format!(
            "agent stream closed before end of turn after {} responses",
            output.message_count
        )));
    }

    info!(count = output.message_count, "task completed");
    Ok(output)
}

fn parse_seconds(raw: &str) -> std::result::Result<Duration, String> {
    let seconds: f64 = raw
        .parse()
        .map_err(|err| format!("invalid number of seconds: {err}"))?;
    if seconds <= 0.0 {
        return Err("timeout must be greater than zero".into());
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())
}

fn init_tracing(args: &Cli) -> Result<()> {
    let default_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
