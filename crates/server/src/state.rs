// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use stepwatch_jobs::{JobConfig, JobController};
use tokio_util::sync::CancellationToken;

use crate::tools::ToolRegistry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Owner of the current job run and its worker.
    pub jobs: Arc<JobController>,
    /// Tools and resources callable over HTTP.
    pub tools: Arc<ToolRegistry>,
    /// Cancelled once the server starts shutting down; ends open status streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(config: JobConfig) -> Arc<Self> {
        Self::with_controller(Arc::new(JobController::new(config)))
    }

    /// Create with an externally-owned controller (the binary keeps a handle
    /// so it can stop the worker after the server shuts down).
    pub fn with_controller(jobs: Arc<JobController>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            jobs,
            tools: Arc::new(ToolRegistry::with_builtins()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
