// crates/client/src/lib.rs
//! Polling client for the stepwatch job server.
//!
//! Starts one job, then reads `/api/status` on a fixed interval and replays
//! each newly applied step exactly once, in order.

pub mod api;
pub mod error;
pub mod poller;
pub mod render;

pub use api::{HttpProgressApi, ProgressApi};
pub use error::ClientError;
pub use poller::{PollConfig, PollOutput, PollingClient, DEFAULT_POLL_INTERVAL};
