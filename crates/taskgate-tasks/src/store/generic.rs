//! Generic metadata store delegating all storage to a [`StorageBackend`].
//!
//! [`GenericMetadataStore`] owns the domain side of persistence: JSON
//! serialization of [`TaskRecord`]s, the retention window from
//! [`StoreConfig`], the choice of status index, and the mapping of
//! [`StorageError`] into [`TaskError`]. Backends only move bytes.
//!
//! # Construction
//!
//! ```
//! use std::time::Duration;
//! use taskgate_tasks::store::{GenericMetadataStore, InMemoryBackend, StoreConfig};
//!
//! let store = GenericMetadataStore::new(InMemoryBackend::new())
//!     .with_config(StoreConfig::default().with_retention(Duration::from_secs(3600)));
//! assert_eq!(store.config().retention.as_secs(), 3600);
//! ```

use crate::domain::TaskRecord;
use crate::error::TaskError;
use crate::store::backend::{status_index, StorageBackend, StorageError};
use crate::store::StoreConfig;
use crate::types::TaskState;

/// Metadata store that delegates storage to a [`StorageBackend`].
///
/// # Type Parameters
///
/// * `B` - A [`StorageBackend`] implementation (in-memory, Redis, ...)
#[derive(Debug)]
pub struct GenericMetadataStore<B: StorageBackend> {
    backend: B,
    config: StoreConfig,
}

impl<B: StorageBackend> GenericMetadataStore<B> {
    /// Creates a store over `backend` with the default 72 hour retention.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: StoreConfig::default(),
        }
    }

    /// Sets the storage configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    // ---- Serialization helpers (private) ----

    fn serialize_record(record: &TaskRecord) -> Result<Vec<u8>, TaskError> {
        serde_json::to_vec(record).map_err(|e| {
            TaskError::MetadataStore(format!("failed to serialize task record: {e}"))
        })
    }

    fn deserialize_record(data: &[u8]) -> Result<TaskRecord, TaskError> {
        serde_json::from_slice(data).map_err(|e| {
            TaskError::MetadataStore(format!("failed to deserialize task record: {e}"))
        })
    }

    fn map_storage_error(err: StorageError, task_id: &str) -> TaskError {
        match err {
            StorageError::NotFound { .. } => TaskError::NotFound {
                task_id: task_id.to_string(),
            },
            StorageError::Backend { message, .. } => TaskError::MetadataStore(message),
        }
    }

    // ---- Domain operations (public) ----

    /// Writes `record` with the configured retention and indexes it under
    /// its creation-time status.
    pub async fn put(&self, record: &TaskRecord) -> Result<(), TaskError> {
        let bytes = Self::serialize_record(record)?;
        let index = status_index(record.status_at_creation.as_str());
        self.backend
            .put_indexed(
                &record.id,
                &bytes,
                &index,
                record.created_at_ms(),
                Some(self.config.retention),
            )
            .await
            .map_err(|e| Self::map_storage_error(e, &record.id))
    }

    /// Reads the record for `task_id`.
    pub async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        let data = self
            .backend
            .get(task_id)
            .await
            .map_err(|e| Self::map_storage_error(e, task_id))?;
        Self::deserialize_record(&data)
    }

    /// Enumerates the IDs indexed under `status`, or all IDs.
    ///
    /// A not-found from the backend here means the index itself is
    /// unreadable, so it is reported as a store failure.
    pub async fn list_ids(&self, status: Option<TaskState>) -> Result<Vec<String>, TaskError> {
        let index = status.map(|s| status_index(s.as_str()));
        self.backend
            .list_ids(index.as_deref())
            .await
            .map_err(|e| TaskError::MetadataStore(e.to_string()))
    }

    /// Sweeps expired records from the backend.
    pub async fn cleanup_expired(&self) -> Result<usize, TaskError> {
        self.backend
            .cleanup_expired()
            .await
            .map_err(|e| TaskError::MetadataStore(e.to_string()))
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
