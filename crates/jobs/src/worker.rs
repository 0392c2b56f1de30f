// crates/jobs/src/worker.rs
//! The background task that advances one job run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::state::SharedJobState;
use crate::types::{JobStatus, JobUpdate};

/// An unexpected failure inside one step of the work loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct WorkerFault(String);

impl WorkerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The unit of work performed before each step is applied.
///
/// Returns the human-readable message recorded for the step.
#[async_trait]
pub trait StepWork: Send + Sync + 'static {
    async fn perform(&self, step: u32, total: u32) -> Result<String, WorkerFault>;
}

/// Sleeps a fixed delay per step.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    delay: Duration,
}

impl SimulatedWork {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl StepWork for SimulatedWork {
    async fn perform(&self, step: u32, total: u32) -> Result<String, WorkerFault> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!("Completed step {step} of {total}"))
    }
}

/// Sole writer of one [`SharedJobState`].
///
/// Runs to completion, cancellation, or its first fault. Faults are caught
/// at the loop boundary: the run is marked failed and stays at its last
/// fully-applied step.
pub struct ProgressWorker {
    state: Arc<SharedJobState>,
    work: Arc<dyn StepWork>,
    cancel: CancellationToken,
    updates: broadcast::Sender<JobUpdate>,
}

impl ProgressWorker {
    pub(crate) fn new(
        state: Arc<SharedJobState>,
        work: Arc<dyn StepWork>,
        cancel: CancellationToken,
        updates: broadcast::Sender<JobUpdate>,
    ) -> Self {
        Self {
            state,
            work,
            cancel,
            updates,
        }
    }

    /// Drive the run and return its terminal status.
    pub async fn run(self) -> JobStatus {
        let job_id = self.state.job_id();
        let total = self.state.total_steps();
        tracing::info!(job_id, total, "Job started");

        while let Some(step) = self.state.next_step() {
            let work = AssertUnwindSafe(self.work.perform(step, total)).catch_unwind();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.stop_cancelled(),
                outcome = work => outcome,
            };

            let message = match outcome {
                Ok(Ok(message)) => message,
                Ok(Err(fault)) => return self.stop_faulted(step, fault.to_string()),
                Err(panic) => return self.stop_faulted(step, panic_message(panic.as_ref())),
            };

            if self.cancel.is_cancelled() {
                return self.stop_cancelled();
            }

            let Some(event) = self.state.apply_step(message, Utc::now()) else {
                break;
            };
            tracing::info!(
                job_id,
                step = event.step,
                total,
                progress = event.progress,
                "Step completed"
            );
            let _ = self.updates.send(JobUpdate::Step { job_id, event });
        }

        let status = self.state.status();
        if status == JobStatus::Completed {
            tracing::info!(job_id, total, "Job completed");
        }
        self.publish_finished(status);
        status
    }

    fn stop_cancelled(&self) -> JobStatus {
        if self.state.cancel(Utc::now()) {
            tracing::info!(job_id = self.state.job_id(), "Job cancelled");
        }
        let status = self.state.status();
        self.publish_finished(status);
        status
    }

    fn stop_faulted(&self, step: u32, error: String) -> JobStatus {
        tracing::error!(job_id = self.state.job_id(), step, error = %error, "Job worker faulted");
        self.state.fail(error, Utc::now());
        let status = self.state.status();
        self.publish_finished(status);
        status
    }

    fn publish_finished(&self, status: JobStatus) {
        let snapshot = self.state.snapshot();
        let _ = self.updates.send(JobUpdate::Finished {
            job_id: snapshot.job_id,
            status,
            current_step: snapshot.current_step,
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}
