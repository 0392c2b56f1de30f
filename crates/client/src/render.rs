// crates/client/src/render.rs
//! Terminal rendering of poll output.

use chrono::{DateTime, Local, Utc};
use stepwatch_jobs::{JobStatus, ProgressEvent, StatusSnapshot};

use crate::poller::PollOutput;

fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// `[HH:MM:SS] Step i: message (xx.x%)`, stamped with the step's own time.
pub fn render_event(event: &ProgressEvent) -> String {
    format!(
        "[{}] Step {}: {} ({:.1}%)",
        clock(event.timestamp),
        event.step,
        event.message,
        event.progress
    )
}

pub fn render_summary(snapshot: &StatusSnapshot) -> Vec<String> {
    let started = snapshot
        .started_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    match snapshot.status {
        JobStatus::Completed => vec![
            "Process completed".to_string(),
            format!("Total steps: {}", snapshot.total_steps),
            format!("Started at: {started}"),
        ],
        status => {
            let mut lines = vec![format!(
                "Process {status} at step {}/{}",
                snapshot.current_step, snapshot.total_steps
            )];
            if let Some(error) = &snapshot.error {
                lines.push(format!("Error: {error}"));
            }
            lines
        }
    }
}

/// Lines to print for one output, in order.
pub fn render(output: &PollOutput) -> Vec<String> {
    match output {
        PollOutput::Started(started) => {
            let mut lines = vec![
                started.message.clone(),
                format!("Process ID: {}", started.process_id),
            ];
            if let Some(previous) = started.superseded {
                lines.push(format!("Superseded job {previous}"));
            }
            lines
        }
        PollOutput::Event(event) => vec![render_event(event)],
        PollOutput::Finished(snapshot) => render_summary(snapshot),
    }
}
