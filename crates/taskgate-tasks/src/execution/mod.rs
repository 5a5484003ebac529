//! Execution backend contract.
//!
//! The [`ExecutionBackend`] is the only component that talks to the system
//! actually running tasks. It allocates task IDs on [`accept`] and is the
//! authority on a task's live state ([`live_state`]).
//!
//! [`InProcessBackend`](local::InProcessBackend) runs registered handlers on
//! the tokio runtime and is what the gateway ships with.
//!
//! [`accept`]: ExecutionBackend::accept
//! [`live_state`]: ExecutionBackend::live_state

pub mod local;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TaskError;
use crate::types::{SubmitTask, TaskArg, TaskState};

pub use local::{handler_fn, FnHandler, InProcessBackend, TaskHandler};

/// A task handed to the execution backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Registered task name.
    pub name: String,
    /// Typed arguments, in call order.
    pub args: Vec<TaskArg>,
    /// Queue override; the backend's default routing when `None`.
    pub routing: Option<String>,
}

impl Submission {
    /// Creates a submission with default routing.
    pub fn new(name: impl Into<String>, args: Vec<TaskArg>) -> Self {
        Self {
            name: name.into(),
            args,
            routing: None,
        }
    }

    /// Sets the routing override (builder pattern).
    pub fn with_routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }
}

impl From<SubmitTask> for Submission {
    fn from(body: SubmitTask) -> Self {
        let routing = body.routing().map(str::to_string);
        Self {
            name: body.name,
            args: body.args,
            routing,
        }
    }
}

/// What the execution backend currently knows about a task.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveState {
    /// Current lifecycle state.
    pub status: TaskState,
    /// Result value; only set when terminal and successful.
    pub result: Option<Value>,
    /// Whether a result may be read (`success` or `failure`).
    pub is_terminal: bool,
}

impl LiveState {
    /// Live state for an in-flight or failed task, carrying no result.
    pub fn new(status: TaskState) -> Self {
        Self {
            status,
            result: None,
            is_terminal: status.is_terminal(),
        }
    }

    /// Live state of a task that finished successfully with `result`.
    pub fn succeeded(result: Value) -> Self {
        Self {
            status: TaskState::Success,
            result: Some(result),
            is_terminal: true,
        }
    }
}

/// Errors reported by an execution backend.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The submission was refused (unknown task name, malformed arguments).
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// The backend holds no state for the ID (never accepted, or expired).
    #[error("unknown task: {task_id}")]
    UnknownTask {
        /// The ID that was queried.
        task_id: String,
    },

    /// The backend could not be reached or failed internally.
    #[error("execution backend unavailable: {0}")]
    Unavailable(String),
}

impl From<ExecutionError> for TaskError {
    fn from(err: ExecutionError) -> Self {
        TaskError::ExecutionBackend(err.to_string())
    }
}

/// Narrow interface to the external execution system.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the coordinator is shared across
/// request handlers behind an `Arc<dyn ExecutionBackend>`.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Submits a task and returns the backend-assigned, never reused ID.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Rejected`] on validation failure.
    /// - [`ExecutionError::Unavailable`] on transport failure.
    async fn accept(&self, submission: &Submission) -> Result<String, ExecutionError>;

    /// Reports the current state of a previously accepted task.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::UnknownTask`] if the ID is not known.
    /// - [`ExecutionError::Unavailable`] on transport failure.
    async fn live_state(&self, task_id: &str) -> Result<LiveState, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn live_state_terminal_flag_follows_status() {
        assert!(!LiveState::new(TaskState::Retry).is_terminal);
        assert!(LiveState::new(TaskState::Failure).is_terminal);

        let done = LiveState::succeeded(json!(42));
        assert_eq!(done.status, TaskState::Success);
        assert!(done.is_terminal);
        assert_eq!(done.result, Some(json!(42)));
    }

    #[test]
    fn submission_from_body_drops_blank_queue() {
        let sub = Submission::from(SubmitTask::new("echo").with_queue(" "));
        assert_eq!(sub.routing, None);

        let sub = Submission::from(SubmitTask::new("echo").with_queue("fast"));
        assert_eq!(sub.routing.as_deref(), Some("fast"));
    }

    #[test]
    fn execution_errors_map_to_backend_error() {
        let err: TaskError = ExecutionError::Unavailable("broker down".to_string()).into();
        assert!(matches!(err, TaskError::ExecutionBackend(ref m) if m.contains("broker down")));
    }
}
