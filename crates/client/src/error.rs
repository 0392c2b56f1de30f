// crates/client/src/error.rs
use std::time::Duration;

use stepwatch_jobs::JobId;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons a polling run ends without observing its job finish.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("job {expected} was superseded by job {found}")]
    Superseded { expected: JobId, found: JobId },

    #[error("no progress past step {step} for {waited:?}")]
    Stalled { step: u32, waited: Duration },
}

impl ClientError {
    pub fn transport(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.into(),
            source: source.into(),
        }
    }
}
