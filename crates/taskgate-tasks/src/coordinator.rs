//! The task coordinator.
//!
//! [`TaskCoordinator`] is the single orchestration point between the
//! gateway, the [`ExecutionBackend`] and the [`MetadataStore`]. It holds no
//! state of its own and is cheap to clone; every operation is at most two
//! sequential calls, one to each collaborator.
//!
//! # Ordering
//!
//! - `submit`: backend first, then store. Nothing is written to the store
//!   unless the backend accepted the task.
//! - `get_status`: store first, then backend. A backend failure aborts the
//!   read; no stale status is returned.
//! - `list_tasks`: store only. Listed entries show the stored creation-time
//!   status, not the live one.
//!
//! # Pagination
//!
//! Listing slices the store's ID enumeration, whose order is store-defined.
//! Writes between two page requests can shift membership; callers that need
//! chronological order sort on `created_at`.

use std::sync::Arc;

use crate::constants::DEFAULT_LIST_LIMIT;
use crate::domain::TaskRecord;
use crate::error::TaskError;
use crate::execution::{ExecutionBackend, Submission};
use crate::store::MetadataStore;
use crate::types::{TaskState, TaskView};

/// Filter and page parameters for [`TaskCoordinator::list_tasks`].
///
/// # Examples
///
/// ```
/// use taskgate_tasks::{ListQuery, TaskState};
///
/// let query = ListQuery::default();
/// assert_eq!(query.limit, 10);
/// assert_eq!(query.offset, 0);
///
/// let query = ListQuery::default()
///     .with_status(TaskState::Pending)
///     .with_limit(25)
///     .with_offset(50);
/// assert_eq!(query.status, Some(TaskState::Pending));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// Only IDs indexed under this status; all IDs when `None`.
    pub status: Option<TaskState>,
    /// Maximum number of entries to return.
    pub limit: usize,
    /// Number of enumerated IDs to skip.
    pub offset: usize,
}

impl ListQuery {
    /// Sets the status filter (builder pattern).
    pub fn with_status(mut self, status: TaskState) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the page size (builder pattern).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the page start (builder pattern).
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

/// Orchestrates submission, status reconciliation and listing.
#[derive(Clone)]
pub struct TaskCoordinator {
    backend: Arc<dyn ExecutionBackend>,
    store: Arc<dyn MetadataStore>,
}

impl std::fmt::Debug for TaskCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCoordinator").finish_non_exhaustive()
    }
}

impl TaskCoordinator {
    /// Creates a coordinator over the given backend and store.
    pub fn new(backend: Arc<dyn ExecutionBackend>, store: Arc<dyn MetadataStore>) -> Self {
        Self { backend, store }
    }

    /// Submits a task and records it as `pending`.
    ///
    /// Returns the backend-assigned task ID.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidRequest`] if the task name is empty.
    /// - [`TaskError::ExecutionBackend`] if the backend refused the task.
    ///   The store is not touched.
    /// - [`TaskError::MetadataPersist`] if the backend accepted the task but
    ///   the record could not be written. The task is orphaned: it runs
    ///   without being tracked, and no compensating action is taken.
    pub async fn submit(&self, submission: Submission) -> Result<String, TaskError> {
        if submission.name.trim().is_empty() {
            return Err(TaskError::InvalidRequest("task name is required".to_string()));
        }

        let task_id = self.backend.accept(&submission).await.map_err(|e| {
            tracing::warn!(name = %submission.name, error = %e, "execution backend refused task");
            TaskError::from(e)
        })?;

        let record = TaskRecord::pending(task_id.clone(), submission.name, submission.args);
        if let Err(e) = self.store.put(&record).await {
            let message = match e {
                TaskError::MetadataStore(message) => message,
                other => other.to_string(),
            };
            tracing::error!(
                task_id = %task_id,
                name = %record.name,
                error = %message,
                "task accepted by backend but not recorded (orphaned)"
            );
            return Err(TaskError::MetadataPersist { task_id, message });
        }

        tracing::info!(task_id = %task_id, name = %record.name, "task submitted");
        Ok(task_id)
    }

    /// Returns the stored record with the backend's live state applied.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if the store has no record for `task_id`,
    ///   even if the backend knows the ID.
    /// - [`TaskError::MetadataStore`] if the store lookup failed.
    /// - [`TaskError::ExecutionBackend`] if the backend could not report the
    ///   live state.
    pub async fn get_status(&self, task_id: &str) -> Result<TaskView, TaskError> {
        let record = self.store.get(task_id).await?;
        let live = self.backend.live_state(task_id).await.map_err(|e| {
            tracing::warn!(task_id, error = %e, "live state unavailable");
            TaskError::from(e)
        })?;
        Ok(record.to_view_with_live(&live))
    }

    /// Lists a page of stored tasks.
    ///
    /// IDs that fail to load after enumeration (typically expired in
    /// between) are skipped, so a page may hold fewer than `limit` entries.
    ///
    /// # Errors
    ///
    /// - [`TaskError::MetadataStore`] if the ID enumeration failed.
    pub async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<TaskView>, TaskError> {
        let ids = self.store.list_ids(query.status).await?;

        let mut tasks = Vec::with_capacity(query.limit.min(ids.len()));
        for id in ids.iter().skip(query.offset).take(query.limit) {
            match self.store.get(id).await {
                Ok(record) => tasks.push(record.to_view()),
                Err(e) => {
                    tracing::debug!(task_id = %id, error = %e, "skipping unreadable list entry");
                },
            }
        }
        Ok(tasks)
    }
}
