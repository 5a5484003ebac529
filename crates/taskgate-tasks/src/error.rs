//! Error types for task coordination.
//!
//! Provides [`TaskError`], the taxonomy every coordinator operation returns.
//! Lower-level failures ([`StorageError`](crate::store::StorageError) and
//! [`ExecutionError`](crate::execution::ExecutionError)) are mapped into it
//! at the layer boundary, so callers only ever match on these five kinds.

/// Errors that can occur during task coordination.
///
/// # Examples
///
/// ```
/// use taskgate_tasks::TaskError;
///
/// let err = TaskError::NotFound {
///     task_id: "missing-task".to_string(),
/// };
/// assert!(err.is_not_found());
/// assert!(err.to_string().contains("missing-task"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The submission is malformed (missing name, bad argument types, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The execution backend rejected a submission or could not report a
    /// task's live state.
    #[error("execution backend error: {0}")]
    ExecutionBackend(String),

    /// A metadata store read or write failed, including index enumeration.
    #[error("metadata store error: {0}")]
    MetadataStore(String),

    /// The backend accepted the task but recording it in the metadata store
    /// failed. The task now runs in the backend without being tracked.
    #[error("task {task_id} was submitted but its metadata could not be saved: {message}")]
    MetadataPersist {
        /// The backend-assigned ID of the orphaned task.
        task_id: String,
        /// The underlying store failure.
        message: String,
    },

    /// No record exists for the task (never submitted, or expired).
    #[error("task not found: {task_id}")]
    NotFound {
        /// The task ID that was looked up.
        task_id: String,
    },
}

impl TaskError {
    /// Returns `true` for [`TaskError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the error means a task is running in the backend
    /// without a metadata record.
    pub fn is_orphaned(&self) -> bool {
        matches!(self, Self::MetadataPersist { .. })
    }
}
