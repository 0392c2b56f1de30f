// crates/jobs/src/error.rs
use thiserror::Error;

use crate::types::JobId;

/// Errors returned by [`crate::JobController`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {job_id} is still running")]
    Conflict { job_id: JobId },
}
