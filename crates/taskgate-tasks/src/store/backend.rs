//! Low-level key-value storage backend trait and supporting types.
//!
//! The [`StorageBackend`] trait defines the contract that every storage
//! engine implements: [`get`](StorageBackend::get),
//! [`put_indexed`](StorageBackend::put_indexed),
//! [`list_ids`](StorageBackend::list_ids) and
//! [`cleanup_expired`](StorageBackend::cleanup_expired).
//!
//! Serialization, retention policy and error mapping do **not** belong here.
//! Backends are dumb stores of opaque bytes plus named ID sets; the domain
//! logic lives in [`GenericMetadataStore`](crate::store::generic::GenericMetadataStore).
//!
//! # Indexes
//!
//! Every record written through [`put_indexed`](StorageBackend::put_indexed)
//! becomes a member of two ID sets: the global [`ALL_TASKS_INDEX`] and the
//! named index passed by the caller (see [`status_index`]). Both memberships
//! and the record itself are written atomically.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub use crate::constants::ALL_TASKS_INDEX;

/// Errors that can occur during raw storage operations.
///
/// `GenericMetadataStore` maps these to
/// [`TaskError`](crate::error::TaskError) variants before surfacing them.
///
/// # Examples
///
/// ```
/// use taskgate_tasks::store::backend::StorageError;
///
/// let err = StorageError::NotFound { id: "task-123".to_string() };
/// assert!(err.to_string().contains("task-123"));
/// ```
#[derive(Debug)]
pub enum StorageError {
    /// No live record exists for the ID.
    NotFound {
        /// The ID that was looked up.
        id: String,
    },

    /// An I/O or backend-specific error occurred (network failure, timeout,
    /// script error, ...).
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available. Accessible via
        /// [`std::error::Error::source()`].
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StorageError {
    /// Builds a [`StorageError::Backend`] without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "record not found: {id}"),
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

/// Key-value storage backend for task metadata.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the coordinator is invoked
/// concurrently from every request handler.
///
/// # Ordering
///
/// [`list_ids`](StorageBackend::list_ids) returns IDs in a backend-defined
/// order. Callers must not assume it is stable across writes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves the bytes stored for `id`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no record exists or it has expired.
    /// - [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn get(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Stores `data` under `id` and adds `id` to [`ALL_TASKS_INDEX`] and to
    /// `index`, all-or-nothing.
    ///
    /// `created_at_ms` orders index members where the backend supports it.
    /// `ttl`, when set, bounds how long the record stays readable.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Backend`] on I/O or backend-specific failures. No
    ///   partial write is left behind.
    async fn put_indexed(
        &self,
        id: &str,
        data: &[u8],
        index: &str,
        created_at_ms: i64,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError>;

    /// Returns the members of `index`, or of [`ALL_TASKS_INDEX`] when `None`.
    ///
    /// Members may point at records that have since expired.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Backend`] if the index cannot be read.
    async fn list_ids(&self, index: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Removes expired records and their index entries.
    ///
    /// Best-effort; expiry is also enforced at read time. Returns the count
    /// of entries removed.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn cleanup_expired(&self) -> Result<usize, StorageError>;
}

/// Index name for records created with the given status.
///
/// # Examples
///
/// ```
/// use taskgate_tasks::store::backend::status_index;
///
/// assert_eq!(status_index("pending"), "status:pending");
/// ```
pub fn status_index(status: &str) -> String {
    format!("status:{status}")
}
