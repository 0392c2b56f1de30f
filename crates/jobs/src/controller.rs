// crates/jobs/src/controller.rs
//! Entry point for starting, reading and stopping the job run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::{JobConfig, SupersedePolicy};
use crate::error::JobError;
use crate::state::{JobState, SharedJobState};
use crate::types::{JobId, JobStatus, JobUpdate, StatusSnapshot};
use crate::worker::{ProgressWorker, SimulatedWork, StepWork};

/// Returned by [`JobController::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedJob {
    pub job_id: JobId,
    pub total_steps: u32,
    pub started_at: DateTime<Utc>,
    /// Job that was cancelled to make room for this one, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<JobId>,
}

/// Completion of a spawned worker; any number of waiters may await it.
type WorkerDone = Shared<BoxFuture<'static, JobStatus>>;

/// The worker task bound to the current state.
struct ActiveJob {
    state: Arc<SharedJobState>,
    cancel: CancellationToken,
    done: WorkerDone,
}

impl ActiveJob {
    fn spawn(state: Arc<SharedJobState>, cancel: CancellationToken, worker: ProgressWorker) -> Self {
        let recorded = Arc::clone(&state);
        let done = tokio::spawn(worker.run())
            .map(move |joined| match joined {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(job_id = recorded.job_id(), error = %e, "Job worker task aborted");
                    recorded.status()
                }
            })
            .boxed()
            .shared();
        Self {
            state,
            cancel,
            done,
        }
    }

    fn is_running(&self) -> bool {
        self.state.status() == JobStatus::Running
    }

    /// Resolves once the worker has stopped.
    async fn settle(&self) -> JobStatus {
        self.done.clone().await
    }
}

/// Owns the current job run and the handle of the worker advancing it.
///
/// Starts are serialized. What happens to a still-running job when a new
/// start arrives is decided by [`SupersedePolicy`]: the old worker is either
/// cancelled and awaited, or the start is refused. A worker is never left
/// running against state the controller no longer reports.
pub struct JobController {
    config: JobConfig,
    work: Arc<dyn StepWork>,
    next_id: AtomicU64,
    active: Mutex<Option<ActiveJob>>,
    current: RwLock<Arc<SharedJobState>>,
    updates: broadcast::Sender<JobUpdate>,
}

impl JobController {
    /// Controller whose jobs sleep `config.step_delay` per step.
    pub fn new(config: JobConfig) -> Self {
        let work = Arc::new(SimulatedWork::new(config.step_delay));
        Self::with_work(config, work)
    }

    /// Controller running custom per-step work.
    pub fn with_work(config: JobConfig, work: Arc<dyn StepWork>) -> Self {
        let (updates, _) = broadcast::channel(config.update_capacity.max(1));
        Self {
            config,
            work,
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
            current: RwLock::new(Arc::new(SharedJobState::idle())),
            updates,
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Replace the current run with a fresh one and spawn its worker.
    ///
    /// Returns as soon as the worker is scheduled. Must be called from
    /// within a Tokio runtime.
    pub async fn start(&self) -> Result<StartedJob, JobError> {
        let mut active = self.active.lock().await;

        let mut superseded = None;
        if let Some(previous) = active.as_ref() {
            if previous.is_running() {
                let job_id = previous.state.job_id();
                match self.config.supersede {
                    SupersedePolicy::Reject => {
                        tracing::warn!(job_id, "Start rejected, job still running");
                        return Err(JobError::Conflict { job_id });
                    }
                    SupersedePolicy::Cancel => {
                        tracing::info!(job_id, "Superseding running job");
                        previous.cancel.cancel();
                        previous.settle().await;
                        superseded = Some(job_id);
                    }
                }
            }
        }

        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let started_at = Utc::now();
        let state = Arc::new(SharedJobState::new(JobState::new(
            job_id,
            self.config.total_steps,
            started_at,
        )));
        let cancel = CancellationToken::new();

        self.set_current(Arc::clone(&state));
        let _ = self.updates.send(JobUpdate::Started {
            job_id,
            total_steps: self.config.total_steps.get(),
            started_at,
        });

        let worker = ProgressWorker::new(
            Arc::clone(&state),
            Arc::clone(&self.work),
            cancel.clone(),
            self.updates.clone(),
        );
        *active = Some(ActiveJob::spawn(state, cancel, worker));

        Ok(StartedJob {
            job_id,
            total_steps: self.config.total_steps.get(),
            started_at,
            superseded,
        })
    }

    /// Snapshot of the current run, or the idle placeholder.
    pub fn status(&self) -> StatusSnapshot {
        self.current_state().snapshot()
    }

    /// Subscribe to push updates from every run this controller starts.
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    /// Cancel the running job and wait for its worker to stop.
    ///
    /// Returns the cancelled job's id, or `None` when nothing was running.
    pub async fn cancel(&self) -> Option<JobId> {
        let active = self.active.lock().await;
        let job = active.as_ref().filter(|job| job.is_running())?;
        let job_id = job.state.job_id();
        job.cancel.cancel();
        job.settle().await;
        Some(job_id)
    }

    /// Wait for the current worker to finish on its own.
    ///
    /// Returns `None` when no job was ever started. The controller stays
    /// usable while this waits; a cancel or start may end the run first.
    pub async fn join(&self) -> Option<JobStatus> {
        let done = self.active.lock().await.as_ref().map(|job| job.done.clone())?;
        Some(done.await)
    }

    /// Stop the in-flight worker, if any, before the process exits.
    pub async fn shutdown(&self) {
        if let Some(job_id) = self.cancel().await {
            tracing::info!(job_id, "Cancelled running job on shutdown");
        }
    }

    fn current_state(&self) -> Arc<SharedJobState> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => {
                tracing::error!("RwLock poisoned reading current job");
                Arc::clone(&poisoned.into_inner())
            }
        }
    }

    fn set_current(&self, state: Arc<SharedJobState>) {
        match self.current.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => {
                tracing::error!("RwLock poisoned writing current job");
                *poisoned.into_inner() = state;
            }
        }
    }
}

impl Default for JobController {
    fn default() -> Self {
        Self::new(JobConfig::default())
    }
}
