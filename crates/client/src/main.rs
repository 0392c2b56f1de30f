// crates/client/src/main.rs
//! Stepwatch polling client binary.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use stepwatch_client::render::render;
use stepwatch_client::{HttpProgressApi, PollConfig, PollingClient};
use stepwatch_observability::{LogConfig, LogFormat};

#[derive(Parser, Debug)]
#[command(
    name = "stepwatch-client",
    version,
    about = "Starts a job on a stepwatch server and prints its progress as it is polled"
)]
struct ClientArgs {
    /// Server root URL
    #[arg(long, env = "STEPWATCH_URL", default_value = "http://localhost:8444")]
    base_url: String,

    /// Delay between status reads, in milliseconds
    #[arg(long, env = "STEPWATCH_POLL_INTERVAL_MS", default_value_t = 500)]
    poll_interval_ms: u64,

    /// Give up when no new step arrives for this many seconds
    #[arg(long, env = "STEPWATCH_STALL_TIMEOUT_SECS")]
    stall_timeout_secs: Option<u64>,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Stderr log format: compact or json
    #[arg(long, env = "STEPWATCH_LOG_FORMAT", default_value = "compact")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ClientArgs::parse();

    let _log_guard = stepwatch_observability::init(
        &LogConfig::new("warn", "stepwatch-client").with_format(args.log_format),
    )?;

    let api = HttpProgressApi::new(
        args.base_url.as_str(),
        Duration::from_secs(args.request_timeout_secs),
    )?;
    let client = PollingClient::new(
        api,
        PollConfig {
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            stall_timeout: args.stall_timeout_secs.map(Duration::from_secs),
        },
    );

    client
        .run(|output| {
            for line in render(&output) {
                println!("{line}");
            }
        })
        .await
        .with_context(|| format!("polling {} failed", args.base_url))?;

    Ok(())
}
