// crates/server/src/routes/process.rs
//! Job control and progress endpoints.
//!
//! - POST /start-process - start (or supersede) the job run, returns 202
//! - GET /status - full snapshot of the current run, for polling clients
//! - GET /status/stream - SSE push stream of the current run
//! - POST /cancel-process - cancel the running job

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use stepwatch_jobs::{
    CancelProcessResponse, JobController, JobId, JobUpdate, ProgressEvent, StartProcessResponse,
    StatusSnapshot,
};
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /api/start-process - Start a job run in the background.
///
/// Returns:
/// - 202 Accepted: job started (a running job may have been superseded)
/// - 409 Conflict: a job is running and the server rejects overlapping starts
pub async fn start_process(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let started = state.jobs.start().await?;

    tracing::info!(
        job_id = started.job_id,
        total_steps = started.total_steps,
        superseded = ?started.superseded,
        "Process started via API"
    );

    let response = StartProcessResponse {
        status: "started".to_string(),
        message: "Process started, poll /api/status for progress".to_string(),
        process_id: started.started_at.to_rfc3339(),
        job_id: started.job_id,
        total_steps: started.total_steps,
        superseded: started.superseded,
    };

    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

/// GET /api/status - Snapshot of the current run.
///
/// Idle placeholder before the first start. Every field comes from one
/// consistent read, so `currentStep` always equals `messages.len()`.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.jobs.status())
}

/// POST /api/cancel-process - Cancel the running job and wait for its worker.
pub async fn cancel_process(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CancelProcessResponse>> {
    let job_id = state
        .jobs
        .cancel()
        .await
        .ok_or_else(|| ApiError::NotFound("No process is running".to_string()))?;

    tracing::info!(job_id, "Process cancelled via API");

    Ok(Json(CancelProcessResponse {
        status: "cancelled".to_string(),
        job_id,
    }))
}

/// One frame of the status stream, before SSE encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub name: &'static str,
    /// JSON payload.
    pub data: String,
    pub id: Option<String>,
}

impl StatusEvent {
    fn json<T: Serialize>(name: &'static str, data: &T) -> Self {
        Self {
            name,
            data: serde_json::to_string(data).unwrap_or_default(),
            id: None,
        }
    }

    fn step(event: &ProgressEvent) -> Self {
        Self {
            id: Some(event.step.to_string()),
            ..Self::json("step", event)
        }
    }

    fn started(snapshot: &StatusSnapshot) -> Option<Self> {
        let update = JobUpdate::Started {
            job_id: snapshot.job_id,
            total_steps: snapshot.total_steps,
            started_at: snapshot.started_at?,
        };
        Some(Self::json("started", &update))
    }

    fn finished(snapshot: &StatusSnapshot) -> Self {
        let update = JobUpdate::Finished {
            job_id: snapshot.job_id,
            status: snapshot.status,
            current_step: snapshot.current_step,
        };
        Self::json("finished", &update)
    }

    pub fn into_event(self) -> Event {
        let event = Event::default().event(self.name).data(self.data);
        match self.id {
            Some(id) => event.id(id),
            None => event,
        }
    }
}

/// Status frames for one subscriber, starting from the current run.
///
/// Event sequence:
/// - `snapshot` once, with everything applied so far
/// - `step` for each newly applied step, in order and without gaps
/// - `started` when the stream moves to a newer run
/// - `finished` once the followed run is terminal, after which the stream ends
///
/// A stream opened while idle waits for the next start. A receiver that
/// falls behind resynchronizes from a fresh snapshot instead of erroring.
/// Cancelling `shutdown` ends the stream at the next await point.
pub fn status_events(
    jobs: Arc<JobController>,
    shutdown: CancellationToken,
) -> impl Stream<Item = StatusEvent> {
    // Subscribe before reading the snapshot so no step falls between them.
    let mut rx = jobs.subscribe();
    let opening = jobs.status();

    async_stream::stream! {
        let mut job_id: JobId = opening.job_id;
        let mut seen = opening.current_step;
        let mut done = opening.status.is_terminal();

        yield StatusEvent::json("snapshot", &opening);
        if done {
            yield StatusEvent::finished(&opening);
        }

        while !done {
            let update = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!(job_id, "Status stream closed for shutdown");
                    break;
                }
                update = rx.recv() => update,
            };

            let resync = match update {
                Ok(started @ JobUpdate::Started { .. }) if started.job_id() > job_id => {
                    if job_id != 0 {
                        tracing::debug!(from = job_id, to = started.job_id(), "Status stream switching runs");
                    }
                    job_id = started.job_id();
                    seen = 0;
                    yield StatusEvent::json("started", &started);
                    false
                }
                Ok(JobUpdate::Step { job_id: id, event }) if id == job_id => {
                    if event.step == seen + 1 {
                        seen = event.step;
                        yield StatusEvent::step(&event);
                        false
                    } else {
                        event.step > seen
                    }
                }
                Ok(finished @ JobUpdate::Finished { .. }) if finished.job_id() == job_id => {
                    done = true;
                    let snapshot = jobs.status();
                    if snapshot.job_id == job_id {
                        for event in snapshot.events_after(seen) {
                            yield StatusEvent::step(event);
                        }
                        yield StatusEvent::finished(&snapshot);
                    } else {
                        yield StatusEvent::json("finished", &finished);
                    }
                    false
                }
                Ok(_) => false,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Status stream lagged, resyncing from snapshot");
                    true
                }
                Err(RecvError::Closed) => {
                    done = true;
                    false
                }
            };

            if resync {
                let snapshot = jobs.status();
                if snapshot.job_id != job_id {
                    job_id = snapshot.job_id;
                    seen = 0;
                    if let Some(started) = StatusEvent::started(&snapshot) {
                        yield started;
                    }
                }
                let fresh = snapshot.events_after(seen);
                for event in fresh {
                    yield StatusEvent::step(event);
                }
                seen += fresh.len() as u32;
                if snapshot.status.is_terminal() {
                    done = true;
                    yield StatusEvent::finished(&snapshot);
                }
            }
        }
    }
}

/// GET /api/status/stream - SSE stream of the current run.
///
/// See [`status_events`] for the frame sequence. Open streams end when the
/// server begins shutting down.
pub async fn stream_status(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = status_events(Arc::clone(&state.jobs), state.shutdown.clone());
    Sse::new(events.map(|e| Ok::<_, Infallible>(e.into_event()))).keep_alive(KeepAlive::default())
}

/// Create the process routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start-process", post(start_process))
        .route("/status", get(get_status))
        .route("/status/stream", get(stream_status))
        .route("/cancel-process", post(cancel_process))
}
