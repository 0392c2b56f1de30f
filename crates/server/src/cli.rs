// crates/server/src/cli.rs
//! Command-line and environment configuration for the server binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use stepwatch_jobs::{JobConfig, SupersedePolicy};
use stepwatch_observability::{LogConfig, LogFormat};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8444;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,stepwatch_server=info,stepwatch_jobs=info";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stepwatch-server",
    version,
    about = "Runs a background step job and reports its progress over HTTP"
)]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "STEPWATCH_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to bind
    #[arg(long, short = 'p', env = "STEPWATCH_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Steps per job run
    #[arg(long, env = "STEPWATCH_TOTAL_STEPS", default_value = "15")]
    pub total_steps: NonZeroU32,

    /// Simulated work per step, in milliseconds
    #[arg(long, env = "STEPWATCH_STEP_DELAY_MS", default_value_t = 1000)]
    pub step_delay_ms: u64,

    /// What a start does while a job is running: cancel it or reject the start
    #[arg(long, env = "STEPWATCH_ON_BUSY", default_value = "cancel")]
    pub on_busy: SupersedePolicy,

    /// Stderr log format: compact or json
    #[arg(long, env = "STEPWATCH_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Also write daily-rotated JSON logs into this directory
    #[arg(long, env = "STEPWATCH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl ServerArgs {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn job_config(&self) -> JobConfig {
        JobConfig::new(self.total_steps, Duration::from_millis(self.step_delay_ms))
            .with_supersede(self.on_busy)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(DEFAULT_LOG_FILTER, "stepwatch-server")
            .with_format(self.log_format)
            .with_log_dir(self.log_dir.clone())
    }
}
