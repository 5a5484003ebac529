//! Metadata store trait, generic implementation, and backends.
//!
//! # Architecture
//!
//! The metadata store has three layers:
//!
//! 1. **[`MetadataStore`]** -- A type-erasure interface used as
//!    `Arc<dyn MetadataStore>` by the [`TaskCoordinator`](crate::TaskCoordinator).
//!
//! 2. **[`GenericMetadataStore<B>`](generic::GenericMetadataStore)** --
//!    Serialization, retention policy and error mapping. Has a blanket
//!    `MetadataStore` impl.
//!
//! 3. **[`StorageBackend`]** -- Dumb KV trait that backends implement
//!    (in-memory, Redis). No domain logic.
//!
//! # Backends
//!
//! - [`InMemoryBackend`](memory::InMemoryBackend) -- process-local, used by
//!   [`InMemoryMetadataStore`](memory::InMemoryMetadataStore) and in tests.
//! - [`RedisBackend`](crate::store::redis::RedisBackend) -- Redis-backed,
//!   behind the `redis` feature flag.
//!
//! # Index staleness
//!
//! Records are indexed under the status they were created with, which is
//! always `pending`. Nothing re-indexes a record when its task advances, so
//! filtering by any other status yields no IDs.

pub mod backend;
pub mod generic;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use backend::{StorageBackend, StorageError};
pub use generic::GenericMetadataStore;
pub use memory::{InMemoryBackend, InMemoryMetadataStore};

use crate::constants::DEFAULT_RETENTION;
use crate::domain::TaskRecord;
use crate::error::TaskError;
use crate::types::TaskState;

/// Retention policy applied to every record written by the store.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use taskgate_tasks::store::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.retention, Duration::from_secs(72 * 3600));
///
/// let short = StoreConfig::default().with_retention(Duration::from_secs(60));
/// assert_eq!(short.retention.as_secs(), 60);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Time-to-live of a record, counted from its write.
    pub retention: Duration,
}

impl StoreConfig {
    /// Sets the retention window (builder pattern).
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Type-erasure interface for metadata storage.
///
/// A blanket implementation exists for
/// [`GenericMetadataStore<B>`](generic::GenericMetadataStore), so any
/// backend wrapped in it can be used as `Arc<dyn MetadataStore>`.
///
/// # Atomicity
///
/// [`put`](MetadataStore::put) writes the record and its index memberships
/// together: either all apply or none do.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Upserts `record` and indexes it under its creation-time status.
    ///
    /// # Errors
    ///
    /// - [`TaskError::MetadataStore`] on serialization or backend failures.
    async fn put(&self, record: &TaskRecord) -> Result<(), TaskError>;

    /// Retrieves the record for `task_id`.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if no live record exists.
    /// - [`TaskError::MetadataStore`] on deserialization or backend failures.
    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError>;

    /// Returns the IDs indexed under `status`, or every ID when `None`.
    ///
    /// # Errors
    ///
    /// - [`TaskError::MetadataStore`] if the index cannot be enumerated.
    async fn list_ids(&self, status: Option<TaskState>) -> Result<Vec<String>, TaskError>;

    /// Removes expired records, returning how many were removed.
    ///
    /// # Errors
    ///
    /// - [`TaskError::MetadataStore`] on backend failures.
    async fn cleanup_expired(&self) -> Result<usize, TaskError>;
}

#[async_trait]
impl<B: StorageBackend + 'static> MetadataStore for generic::GenericMetadataStore<B> {
    async fn put(&self, record: &TaskRecord) -> Result<(), TaskError> {
        generic::GenericMetadataStore::put(self, record).await
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        generic::GenericMetadataStore::get(self, task_id).await
    }

    async fn list_ids(&self, status: Option<TaskState>) -> Result<Vec<String>, TaskError> {
        generic::GenericMetadataStore::list_ids(self, status).await
    }

    async fn cleanup_expired(&self) -> Result<usize, TaskError> {
        generic::GenericMetadataStore::cleanup_expired(self).await
    }
}
