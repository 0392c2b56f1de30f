// crates/client/src/poller.rs
//! Reconstructs a job's event sequence by polling its snapshot.

use std::time::Duration;

use chrono::{DateTime, Utc};
use stepwatch_jobs::{JobId, ProgressEvent, StartProcessResponse, StatusSnapshot};
use tokio::time::Instant;

use crate::api::ProgressApi;
use crate::error::ClientError;

/// Default delay between two status reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What a polling run reports, in order: one `Started`, each event exactly
/// once, then one `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutput {
    Started(StartProcessResponse),
    Event(ProgressEvent),
    /// Terminal snapshot: completed, cancelled or failed.
    Finished(StatusSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub poll_interval: Duration,
    /// Give up when no new step shows up for this long.
    pub stall_timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stall_timeout: None,
        }
    }
}

pub struct PollingClient<A> {
    api: A,
    config: PollConfig,
}

impl<A: ProgressApi> PollingClient<A> {
    pub fn new(api: A, config: PollConfig) -> Self {
        Self { api, config }
    }

    /// Start one job and follow it until it reaches a terminal status.
    ///
    /// Every unseen event is replayed in order on each poll, however many
    /// steps advanced in between. Transport and HTTP failures end the run
    /// immediately, without retry. Returns the terminal snapshot.
    pub async fn run<F>(&self, mut sink: F) -> Result<StatusSnapshot, ClientError>
    where
        F: FnMut(PollOutput),
    {
        let started = self.api.start().await?;
        tracing::info!(
            job_id = started.job_id,
            total_steps = started.total_steps,
            process_id = %started.process_id,
            "Process started"
        );
        let expected_start = DateTime::parse_from_rfc3339(&started.process_id)
            .ok()
            .map(|t| t.with_timezone(&Utc));
        let job_id = started.job_id;
        sink(PollOutput::Started(started));

        let mut last_seen = 0u32;
        let mut last_progress = Instant::now();

        loop {
            let snapshot = self.api.status().await?;
            check_same_run(job_id, expected_start, last_seen, &snapshot)?;

            let fresh = snapshot.events_after(last_seen);
            if !fresh.is_empty() {
                for event in fresh {
                    sink(PollOutput::Event(event.clone()));
                }
                last_seen += fresh.len() as u32;
                last_progress = Instant::now();
            }

            if snapshot.is_complete || snapshot.status.is_terminal() {
                tracing::info!(
                    job_id,
                    status = %snapshot.status,
                    current_step = snapshot.current_step,
                    "Process finished"
                );
                sink(PollOutput::Finished(snapshot.clone()));
                return Ok(snapshot);
            }

            if let Some(limit) = self.config.stall_timeout {
                let waited = last_progress.elapsed();
                if waited >= limit {
                    tracing::warn!(job_id, step = last_seen, ?waited, "Process stalled");
                    return Err(ClientError::Stalled {
                        step: last_seen,
                        waited,
                    });
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Events of two different runs are never stitched together.
fn check_same_run(
    job_id: JobId,
    expected_start: Option<DateTime<Utc>>,
    last_seen: u32,
    snapshot: &StatusSnapshot,
) -> Result<(), ClientError> {
    let other_start = match (expected_start, snapshot.started_at) {
        (Some(expected), Some(actual)) => expected != actual,
        _ => false,
    };
    if snapshot.job_id != job_id || other_start || snapshot.current_step < last_seen {
        return Err(ClientError::Superseded {
            expected: job_id,
            found: snapshot.job_id,
        });
    }
    Ok(())
}
