//! Task record -- the metadata store's representation of a task.
//!
//! A record is written once, at submission, and is never mutated
//! afterwards. Its `status_at_creation` is therefore always
//! [`TaskState::Pending`]; the live status is derived from the execution
//! backend at read time and merged in by [`TaskRecord::to_view_with_live`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::LiveState;
use crate::types::{TaskArg, TaskState, TaskView};

/// Durable metadata kept for one submitted task.
///
/// # Examples
///
/// ```
/// use taskgate_tasks::{TaskRecord, TaskState};
///
/// let record = TaskRecord::pending("abc", "echo", Vec::new());
/// assert_eq!(record.status_at_creation, TaskState::Pending);
/// assert!(record.result.is_none());
///
/// let view = record.to_view();
/// assert_eq!(view.status, TaskState::Pending);
/// assert_eq!(view.name.as_deref(), Some("echo"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Backend-assigned ID; the primary key.
    pub id: String,

    /// Task type identifier.
    pub name: String,

    /// Submission arguments, in call order.
    #[serde(default)]
    pub args: Vec<TaskArg>,

    /// The status the record was indexed under when it was created.
    #[serde(rename = "status")]
    pub status_at_creation: TaskState,

    /// Submission time.
    pub created_at: DateTime<Utc>,

    /// Result value. Nothing writes it after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Persistence-layer error description. Nothing writes it after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    /// Creates the record written at submission: `pending`, created now.
    pub fn pending(id: impl Into<String>, name: impl Into<String>, args: Vec<TaskArg>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
            status_at_creation: TaskState::Pending,
            created_at: Utc::now(),
            result: None,
            error: None,
        }
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn created_at_ms(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// Creation time as RFC 3339 with second precision and a `Z` suffix.
    pub fn created_at_rfc3339(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Maps the record to a response using only its stored fields.
    ///
    /// This is the listing view: the status shown is the creation-time one.
    pub fn to_view(&self) -> TaskView {
        TaskView {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            status: self.status_at_creation,
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: Some(self.created_at_rfc3339()),
        }
    }

    /// Maps the record to a response with the backend's live state applied.
    ///
    /// The live status always replaces the stored one. A result is only
    /// included once the backend reports a terminal state; the error field
    /// stays the stored one.
    pub fn to_view_with_live(&self, live: &LiveState) -> TaskView {
        TaskView {
            id: self.id.clone(),
            name: Some(self.name.clone()),
            status: live.status,
            result: if live.is_terminal {
                live.result.clone()
            } else {
                None
            },
            error: self.error.clone(),
            created_at: Some(self.created_at_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_record() -> TaskRecord {
        let mut record = TaskRecord::pending(
            "t-1",
            "add",
            vec![TaskArg::new("int64", json!(1)), TaskArg::new("int64", json!(2))],
        );
        record.created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        record
    }

    #[test]
    fn created_at_is_second_precision_utc() {
        let record = fixed_record();
        assert_eq!(record.created_at_rfc3339(), "2024-05-01T12:30:45Z");
    }

    #[test]
    fn stored_status_serializes_as_status() {
        let json = serde_json::to_value(fixed_record()).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("status_at_creation").is_none());
        assert!(json.get("result").is_none());

        let back: TaskRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, fixed_record());
    }

    #[test]
    fn live_state_replaces_stored_status() {
        let record = fixed_record();
        let live = LiveState {
            status: TaskState::Success,
            result: Some(json!(3)),
            is_terminal: true,
        };
        let view = record.to_view_with_live(&live);
        assert_eq!(view.status, TaskState::Success);
        assert_eq!(view.result, Some(json!(3)));
        assert_eq!(view.created_at.as_deref(), Some("2024-05-01T12:30:45Z"));
    }

    #[test]
    fn in_flight_state_has_no_result() {
        let record = fixed_record();
        let live = LiveState {
            status: TaskState::Started,
            result: Some(json!("partial")),
            is_terminal: false,
        };
        let view = record.to_view_with_live(&live);
        assert_eq!(view.status, TaskState::Started);
        assert!(view.result.is_none());
    }

    #[test]
    fn stored_error_is_kept() {
        let mut record = fixed_record();
        record.error = Some("write lagged".to_string());
        let live = LiveState {
            status: TaskState::Failure,
            result: None,
            is_terminal: true,
        };
        let view = record.to_view_with_live(&live);
        assert_eq!(view.error.as_deref(), Some("write lagged"));
    }
}
