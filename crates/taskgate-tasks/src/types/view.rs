//! Request and response shapes exchanged with the gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::args::{validate_args, TaskArg};
use super::task::TaskState;
use crate::error::TaskError;

/// A task as returned to clients.
///
/// Optional fields are omitted from the JSON output when absent, so the
/// submit acknowledgement is just `{"id": ..., "status": "pending"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    /// Backend-assigned task ID.
    pub id: String,

    /// Task type identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Live status (status reads) or stored status (listings).
    pub status: TaskState,

    /// Result value, only once the task completed successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Stored error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation time, RFC 3339 in UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TaskView {
    /// The acknowledgement returned by a successful submission.
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            status: TaskState::Pending,
            result: None,
            error: None,
            created_at: None,
        }
    }
}

/// Body of a task submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitTask {
    /// Registered task name.
    pub name: String,

    /// Typed arguments, in call order.
    #[serde(default)]
    pub args: Vec<TaskArg>,

    /// Routing override; the backend's default queue when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

impl SubmitTask {
    /// Creates a submission with no arguments and default routing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            queue: None,
        }
    }

    /// Appends an argument (builder pattern).
    pub fn with_arg(mut self, arg: TaskArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Sets the routing override (builder pattern).
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Rejects an empty name and arguments that do not match their types.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.name.trim().is_empty() {
            return Err(TaskError::InvalidRequest("task name is required".to_string()));
        }
        validate_args(&self.args)
    }

    /// The routing hint, with an empty string treated as absent.
    pub fn routing(&self) -> Option<&str> {
        self.queue.as_deref().filter(|q| !q.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepted_view_omits_optional_fields() {
        let json = serde_json::to_value(TaskView::accepted("abc")).unwrap();
        assert_eq!(json, json!({"id": "abc", "status": "pending"}));
    }

    #[test]
    fn submit_body_defaults() {
        let body: SubmitTask = serde_json::from_value(json!({"name": "echo"})).unwrap();
        assert!(body.args.is_empty());
        assert!(body.queue.is_none());
        assert!(body.validate().is_ok());
    }

    #[test]
    fn empty_name_is_invalid() {
        let err = SubmitTask::new("  ").validate().unwrap_err();
        assert!(matches!(err, TaskError::InvalidRequest(_)));
    }

    #[test]
    fn empty_queue_means_default_routing() {
        assert_eq!(SubmitTask::new("echo").with_queue("").routing(), None);
        assert_eq!(
            SubmitTask::new("echo").with_queue("high").routing(),
            Some("high")
        );
    }

    #[test]
    fn bad_argument_fails_validation() {
        let body = SubmitTask::new("add").with_arg(TaskArg::new("int64", json!("x")));
        assert!(body.validate().is_err());
    }
}
