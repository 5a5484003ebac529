//! Task lifecycle states.
//!
//! The execution backend is the authority for a task's state; the metadata
//! store only ever records [`TaskState::Pending`] at creation.
//!
//! # State Machine
//!
//! ```text
//! Pending -> Received -> Started -> Success
//!                                -> Failure
//!                                -> Retry -> Started
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Execution state of a task as reported by the execution backend.
///
/// Serializes as lowercase (`"pending"`, `"success"`, ...).
///
/// # Examples
///
/// ```
/// use taskgate_tasks::TaskState;
///
/// assert!(!TaskState::Started.is_terminal());
/// assert!(TaskState::Failure.is_terminal());
/// assert_eq!("SUCCESS".parse::<TaskState>().unwrap(), TaskState::Success);
/// assert!("done".parse::<TaskState>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Submitted and waiting in a queue.
    Pending,
    /// Picked up from the queue by a worker.
    Received,
    /// Executing.
    Started,
    /// Failed and scheduled to run again.
    Retry,
    /// Finished successfully (terminal).
    Success,
    /// Finished with an error (terminal).
    Failure,
}

impl TaskState {
    /// Every state, in lifecycle order.
    pub const ALL: [TaskState; 6] = [
        Self::Pending,
        Self::Received,
        Self::Started,
        Self::Retry,
        Self::Success,
        Self::Failure,
    ];

    /// Returns `true` for states from which a result may be read.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Lowercase wire name, also used as the status index name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Received => "received",
            Self::Started => "started",
            Self::Retry => "retry",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                TaskError::InvalidRequest(
                    "invalid status filter (valid: pending, received, started, retry, success, failure)"
                        .to_string(),
                )
            })
    }
}
