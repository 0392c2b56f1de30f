// crates/jobs/src/types.rs
//! Wire types for the step-job system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of one job run. `0` is reserved for the idle placeholder.
pub type JobId = u64;

/// Lifecycle of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// No job has been started yet.
    Idle,
    Running,
    Completed,
    /// Superseded by a newer start or cancelled explicitly.
    Cancelled,
    /// The worker faulted; the run stalls at its last applied step.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// True once the run can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage of `step` over `total`, `0.0` when `total` is zero.
pub fn progress_percent(step: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(step) / f64::from(total) * 100.0
}

/// One applied step. Immutable once appended to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 1-based, equal to the event's position in the run's log.
    pub step: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// `step / totalSteps * 100`.
    pub progress: f64,
}

/// Immutable copy of a run's state, as returned by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub current_step: u32,
    pub total_steps: u32,
    pub progress_percentage: f64,
    pub is_complete: bool,
    pub messages: Vec<ProgressEvent>,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    /// Events the caller has not seen yet, given how many it has already seen.
    ///
    /// Bounded by `current_step`, so a log that runs ahead of the counter
    /// never yields steps the snapshot does not claim.
    pub fn events_after(&self, seen: u32) -> &[ProgressEvent] {
        let end = (self.current_step as usize).min(self.messages.len());
        let start = (seen as usize).min(end);
        &self.messages[start..end]
    }
}

/// Push notification published by the worker after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobUpdate {
    #[serde(rename_all = "camelCase")]
    Started {
        job_id: JobId,
        total_steps: u32,
        started_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Step { job_id: JobId, event: ProgressEvent },
    #[serde(rename_all = "camelCase")]
    Finished {
        job_id: JobId,
        status: JobStatus,
        current_step: u32,
    },
}

impl JobUpdate {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Started { job_id, .. } | Self::Step { job_id, .. } | Self::Finished { job_id, .. } => {
                *job_id
            }
        }
    }
}

/// Body of a successful `POST /api/start-process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessResponse {
    pub status: String,
    pub message: String,
    /// Start timestamp of the job; an opaque identifier for logs only.
    pub process_id: String,
    pub job_id: JobId,
    pub total_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded: Option<JobId>,
}

/// Body of a successful `POST /api/cancel-process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelProcessResponse {
    pub status: String,
    pub job_id: JobId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 3), 0.0);
        assert!((progress_percent(1, 3) - 33.333_333).abs() < 1e-4);
        assert!((progress_percent(2, 3) - 66.666_666).abs() < 1e-4);
        assert_eq!(progress_percent(3, 3), 100.0);
        assert_eq!(progress_percent(15, 15), 100.0);
    }

    #[test]
    fn test_progress_percent_zero_total() {
        assert_eq!(progress_percent(0, 0), 0.0);
    }

    #[test]
    fn test_job_status_serialize() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let parsed: JobStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, JobStatus::Cancelled);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = StatusSnapshot {
            job_id: 7,
            status: JobStatus::Running,
            current_step: 1,
            total_steps: 4,
            progress_percentage: 25.0,
            is_complete: false,
            messages: vec![ProgressEvent {
                step: 1,
                message: "Completed step 1 of 4".to_string(),
                timestamp: "2026-02-05T12:00:00Z".parse().unwrap(),
                progress: 25.0,
            }],
            started_at: Some("2026-02-05T11:59:59Z".parse().unwrap()),
            finished_at: None,
            error: None,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["jobId"], 7);
        assert_eq!(json["currentStep"], 1);
        assert_eq!(json["totalSteps"], 4);
        assert_eq!(json["progressPercentage"], 25.0);
        assert_eq!(json["isComplete"], false);
        assert_eq!(json["messages"][0]["progress"], 25.0);
        assert!(json.get("error").is_none());
        assert!(json.get("finishedAt").is_none());
    }

    #[test]
    fn test_events_after_clamps() {
        let snapshot = StatusSnapshot {
            job_id: 1,
            status: JobStatus::Running,
            current_step: 0,
            total_steps: 2,
            progress_percentage: 0.0,
            is_complete: false,
            messages: Vec::new(),
            started_at: None,
            finished_at: None,
            error: None,
        };
        assert!(snapshot.events_after(0).is_empty());
        assert!(snapshot.events_after(5).is_empty());
    }

    #[test]
    fn test_events_after_stops_at_current_step() {
        let event = |step: u32| ProgressEvent {
            step,
            message: format!("Completed step {step} of 4"),
            timestamp: "2026-02-05T12:00:00Z".parse().unwrap(),
            progress: f64::from(step) * 25.0,
        };
        let snapshot = StatusSnapshot {
            job_id: 1,
            status: JobStatus::Running,
            current_step: 2,
            total_steps: 4,
            progress_percentage: 50.0,
            is_complete: false,
            messages: (1..=3).map(event).collect(),
            started_at: None,
            finished_at: None,
            error: None,
        };
        let steps = |seen| snapshot.events_after(seen).iter().map(|e| e.step).collect::<Vec<_>>();
        assert_eq!(steps(0), vec![1, 2]);
        assert_eq!(steps(1), vec![2]);
        assert!(steps(2).is_empty());
        assert!(steps(3).is_empty());
    }

    #[test]
    fn test_start_response_round_trip_keys() {
        let body = r#"{"status":"started","message":"m","processId":"2026-02-05T12:00:00+00:00","jobId":1,"totalSteps":15}"#;
        let parsed: StartProcessResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.job_id, 1);
        assert!(parsed.superseded.is_none());
    }

    #[test]
    fn test_update_job_id() {
        let update = JobUpdate::Finished {
            job_id: 3,
            status: JobStatus::Completed,
            current_step: 2,
        };
        assert_eq!(update.job_id(), 3);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "finished");
        assert_eq!(json["currentStep"], 2);
    }
}
