// crates/jobs/src/config.rs
//! Job configuration.

use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Steps per job when nothing else is configured.
pub const DEFAULT_TOTAL_STEPS: u32 = 15;

/// Simulated work per step when nothing else is configured.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

/// Push updates buffered per subscriber before it lags.
pub const DEFAULT_UPDATE_CAPACITY: usize = 256;

/// What a start request does while another job is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupersedePolicy {
    /// Cancel the running worker, wait for it to stop, then start fresh.
    #[default]
    Cancel,
    /// Refuse the start with a conflict.
    Reject,
}

impl SupersedePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for SupersedePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupersedePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancel" => Ok(Self::Cancel),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown policy '{other}', expected 'cancel' or 'reject'")),
        }
    }
}

/// Settings fixed for every job a controller starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub total_steps: NonZeroU32,
    pub step_delay: Duration,
    pub supersede: SupersedePolicy,
    /// Capacity of the push-update channel; a slower subscriber sees `Lagged`.
    pub update_capacity: usize,
}

impl JobConfig {
    pub fn new(total_steps: NonZeroU32, step_delay: Duration) -> Self {
        Self {
            total_steps,
            step_delay,
            supersede: SupersedePolicy::default(),
            update_capacity: DEFAULT_UPDATE_CAPACITY,
        }
    }

    pub fn with_supersede(mut self, supersede: SupersedePolicy) -> Self {
        self.supersede = supersede;
        self
    }

    pub fn with_update_capacity(mut self, capacity: usize) -> Self {
        self.update_capacity = capacity.max(1);
        self
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self::new(
            NonZeroU32::new(DEFAULT_TOTAL_STEPS).unwrap_or(NonZeroU32::MIN),
            DEFAULT_STEP_DELAY,
        )
    }
}
