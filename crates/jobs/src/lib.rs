// crates/jobs/src/lib.rs
//! Background step-job system.
//!
//! Provides:
//! - `JobController` - starts, supersedes and cancels the single job run
//! - `SharedJobState` - lock-guarded progress state for one run
//! - `ProgressWorker` - the task that advances a run step by step
//! - `StatusSnapshot` / `ProgressEvent` - polling-compatible wire types

pub mod config;
pub mod controller;
pub mod error;
pub mod state;
pub mod types;
pub mod worker;

pub use config::{JobConfig, SupersedePolicy};
pub use controller::{JobController, StartedJob};
pub use error::JobError;
pub use state::{JobState, SharedJobState};
pub use types::{
    progress_percent, CancelProcessResponse, JobId, JobStatus, JobUpdate, ProgressEvent,
    StartProcessResponse, StatusSnapshot,
};
pub use worker::{ProgressWorker, SimulatedWork, StepWork, WorkerFault};
