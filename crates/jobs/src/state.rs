// crates/jobs/src/state.rs
//! Progress state for a single job run.
//!
//! [`JobState`] is plain data; [`SharedJobState`] wraps it in one
//! `RwLock` so the worker's "append event + bump counter" pair is applied
//! under a single write guard and readers never see the two out of sync.

use std::num::NonZeroU32;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::types::{progress_percent, JobId, JobStatus, ProgressEvent, StatusSnapshot};

/// The mutable record of one job run.
///
/// Invariants held by every method:
/// - `current_step <= total_steps`
/// - `events.len() == current_step` and `events[i].step == i + 1`
/// - `status == Completed` iff `current_step == total_steps` (and `total_steps > 0`)
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    job_id: JobId,
    status: JobStatus,
    current_step: u32,
    total_steps: u32,
    events: Vec<ProgressEvent>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl JobState {
    /// The placeholder reported before any job has been started.
    pub fn idle() -> Self {
        Self {
            job_id: 0,
            status: JobStatus::Idle,
            current_step: 0,
            total_steps: 0,
            events: Vec::new(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// A fresh run at step zero.
    pub fn new(job_id: JobId, total_steps: NonZeroU32, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            current_step: 0,
            total_steps: total_steps.get(),
            events: Vec::with_capacity(total_steps.get() as usize),
            started_at: Some(started_at),
            finished_at: None,
            error: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// The step the worker would apply next, or `None` once nothing is left.
    pub fn next_step(&self) -> Option<u32> {
        (self.status == JobStatus::Running && self.current_step < self.total_steps)
            .then_some(self.current_step + 1)
    }

    /// Append the next event and advance the counter as one unit.
    ///
    /// Completes the run when the last step lands. Returns `None` (and
    /// changes nothing) when the run is not accepting steps.
    pub fn apply_step(&mut self, message: String, timestamp: DateTime<Utc>) -> Option<ProgressEvent> {
        let step = self.next_step()?;
        let event = ProgressEvent {
            step,
            message,
            timestamp,
            progress: progress_percent(step, self.total_steps),
        };
        self.events.push(event.clone());
        self.current_step = step;
        if self.current_step == self.total_steps {
            self.status = JobStatus::Completed;
            self.finished_at = Some(timestamp);
        }
        Some(event)
    }

    /// Stop a running job, keeping its applied steps. No-op otherwise.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(at);
        true
    }

    /// Mark a running job as faulted. `is_complete` stays false.
    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(at);
        true
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            job_id: self.job_id,
            status: self.status,
            current_step: self.current_step,
            total_steps: self.total_steps,
            progress_percentage: progress_percent(self.current_step, self.total_steps),
            is_complete: self.is_complete(),
            messages: self.events.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
        }
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Lock-guarded [`JobState`] shared between one worker and any number of readers.
///
/// Mutating methods are crate-private: only the worker bound to this
/// instance writes to it.
#[derive(Debug)]
pub struct SharedJobState {
    inner: RwLock<JobState>,
}

impl SharedJobState {
    pub fn new(state: JobState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    pub fn idle() -> Self {
        Self::new(JobState::idle())
    }

    fn read(&self) -> RwLockReadGuard<'_, JobState> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::error!("RwLock poisoned reading job state");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobState> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::error!("RwLock poisoned writing job state");
            poisoned.into_inner()
        })
    }

    /// Copy of the current state, taken under the read lock.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.read().snapshot()
    }

    pub fn job_id(&self) -> JobId {
        self.read().job_id()
    }

    pub fn status(&self) -> JobStatus {
        self.read().status()
    }

    pub fn total_steps(&self) -> u32 {
        self.read().total_steps()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.read().started_at()
    }

    pub fn next_step(&self) -> Option<u32> {
        self.read().next_step()
    }

    pub(crate) fn apply_step(&self, message: String, timestamp: DateTime<Utc>) -> Option<ProgressEvent> {
        self.write().apply_step(message, timestamp)
    }

    pub(crate) fn cancel(&self, at: DateTime<Utc>) -> bool {
        self.write().cancel(at)
    }

    pub(crate) fn fail(&self, error: impl Into<String>, at: DateTime<Utc>) -> bool {
        self.write().fail(error, at)
    }
}

impl Default for SharedJobState {
    fn default() -> Self {
        Self::idle()
    }
}

// =============================================================================
// Tests
// =============================================================================
