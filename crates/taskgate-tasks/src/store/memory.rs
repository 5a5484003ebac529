//! In-memory storage backend and metadata store.
//!
//! [`InMemoryBackend`] is a thread-safe [`StorageBackend`] holding records
//! and their index sets behind a single [`parking_lot::RwLock`], so a write
//! and its index memberships become visible together. Index sets are
//! insertion-ordered ([`IndexSet`]).
//!
//! [`InMemoryMetadataStore`] is a thin wrapper around
//! [`GenericMetadataStore<InMemoryBackend>`](GenericMetadataStore) with a
//! zero-argument constructor.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use taskgate_tasks::store::memory::InMemoryMetadataStore;
//! use taskgate_tasks::store::StoreConfig;
//!
//! let store = InMemoryMetadataStore::new()
//!     .with_config(StoreConfig::default().with_retention(Duration::from_secs(600)));
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::domain::TaskRecord;
use crate::error::TaskError;
use crate::store::backend::{StorageBackend, StorageError, ALL_TASKS_INDEX};
use crate::store::generic::GenericMetadataStore;
use crate::types::TaskState;

use super::{MetadataStore, StoreConfig};

// ---- InMemoryBackend: dumb KV store ----

#[derive(Debug)]
struct StoredEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, StoredEntry>,
    indexes: HashMap<String, IndexSet<String>>,
}

/// Thread-safe in-memory storage backend.
///
/// Expired records stay in memory until [`cleanup_expired`] runs but are
/// reported as not found by [`get`]. Index entries are only dropped by
/// [`cleanup_expired`], so listings may name IDs whose record is gone.
///
/// [`get`]: StorageBackend::get
/// [`cleanup_expired`]: StorageBackend::cleanup_expired
///
/// # Examples
///
/// ```
/// use taskgate_tasks::store::memory::InMemoryBackend;
/// use taskgate_tasks::store::GenericMetadataStore;
///
/// let backend = InMemoryBackend::new();
/// assert!(backend.is_empty());
/// let store = GenericMetadataStore::new(backend);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    inner: RwLock<Inner>,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records held, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Returns `true` if the backend holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Drops the record for `id` while leaving its index entries in place,
    /// the same state a lapsed TTL leaves behind before the sweep.
    ///
    /// Returns `true` if a record was removed.
    pub fn evict(&self, id: &str) -> bool {
        self.inner.write().records.remove(id).is_some()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let inner = self.inner.read();
        match inner.records.get(id) {
            Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.data.clone()),
            _ => Err(StorageError::NotFound { id: id.to_string() }),
        }
    }

    async fn put_indexed(
        &self,
        id: &str,
        data: &[u8],
        index: &str,
        _created_at_ms: i64,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        let mut inner = self.inner.write();
        inner.records.insert(
            id.to_string(),
            StoredEntry {
                data: data.to_vec(),
                expires_at,
            },
        );
        for name in [ALL_TASKS_INDEX, index] {
            inner
                .indexes
                .entry(name.to_string())
                .or_default()
                .insert(id.to_string());
        }
        Ok(())
    }

    async fn list_ids(&self, index: Option<&str>) -> Result<Vec<String>, StorageError> {
        let name = index.unwrap_or(ALL_TASKS_INDEX);
        let inner = self.inner.read();
        Ok(inner
            .indexes
            .get(name)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let Inner { records, indexes } = &mut *inner;

        let expired: Vec<String> = records
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            records.remove(id);
        }

        // Index entries whose record is gone, expired just now or evicted
        // earlier.
        for members in indexes.values_mut() {
            members.retain(|id| records.contains_key(id));
        }
        indexes.retain(|_, members| !members.is_empty());

        Ok(expired.len())
    }
}

// ---- InMemoryMetadataStore: thin wrapper around GenericMetadataStore<InMemoryBackend> ----

/// In-memory metadata store using [`GenericMetadataStore`] over
/// [`InMemoryBackend`].
#[derive(Debug)]
pub struct InMemoryMetadataStore {
    inner: GenericMetadataStore<InMemoryBackend>,
}

impl InMemoryMetadataStore {
    /// Creates a store with the default 72 hour retention.
    pub fn new() -> Self {
        Self {
            inner: GenericMetadataStore::new(InMemoryBackend::new()),
        }
    }

    /// Sets the storage configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &InMemoryBackend {
        self.inner.backend()
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn put(&self, record: &TaskRecord) -> Result<(), TaskError> {
        self.inner.put(record).await
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.inner.get(task_id).await
    }

    async fn list_ids(&self, status: Option<TaskState>) -> Result<Vec<String>, TaskError> {
        self.inner.list_ids(status).await
    }

    async fn cleanup_expired(&self) -> Result<usize, TaskError> {
        self.inner.cleanup_expired().await
    }
}
