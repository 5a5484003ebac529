//! Redis storage backend for task metadata.
//!
//! [`RedisBackend`] implements [`StorageBackend`] on Redis. Records are plain
//! string keys with a millisecond TTL; indexes are sorted sets scored by
//! creation time. Writes go through a Lua script (`redis::Script`) so the
//! record, its TTL and both index memberships land in one atomic step.
//!
//! # Key Schema
//!
//! | Key Pattern | Type | Purpose |
//! |-------------|------|---------|
//! | `{prefix}:task:{id}` | String | Serialized `TaskRecord` JSON |
//! | `{prefix}:idx:all` | Sorted Set | Every task ID |
//! | `{prefix}:idx:status:{status}` | Sorted Set | IDs created with `status` |
//! | `{prefix}:idx:names` | Set | Names of all index keys, for cleanup |
//!
//! Record keys expire on their own. Index entries outlive them until
//! [`cleanup_expired`](StorageBackend::cleanup_expired) trims every index
//! below `now - retention`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use taskgate_tasks::store::redis::RedisBackend;
//! use taskgate_tasks::store::GenericMetadataStore;
//!
//! # async fn example() {
//! let backend = RedisBackend::new("redis://127.0.0.1:6379").await.unwrap();
//! let store = GenericMetadataStore::new(backend);
//! # }
//! ```

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Script};
use async_trait::async_trait;

use crate::constants::{ALL_TASKS_INDEX, DEFAULT_KEY_PREFIX, DEFAULT_RETENTION};
use crate::store::backend::{StorageBackend, StorageError};

// ---------------------------------------------------------------------------
// Lua script constants
// ---------------------------------------------------------------------------

/// Put: write the record with its TTL and add it to both indexes.
///
/// KEYS[1] = record key, KEYS[2] = all-tasks index, KEYS[3] = named index,
/// KEYS[4] = index-name registry.
/// ARGV[1] = data JSON, ARGV[2] = TTL in ms (or "" for none),
/// ARGV[3] = task id, ARGV[4] = creation timestamp score.
const LUA_PUT_INDEXED: &str = r#"
if ARGV[2] ~= '' then
    redis.call('SET', KEYS[1], ARGV[1], 'PX', tonumber(ARGV[2]))
else
    redis.call('SET', KEYS[1], ARGV[1])
end

redis.call('ZADD', KEYS[2], 'NX', tonumber(ARGV[4]), ARGV[3])
redis.call('ZADD', KEYS[3], 'NX', tonumber(ARGV[4]), ARGV[3])
redis.call('SADD', KEYS[4], KEYS[2], KEYS[3])

return 1
"#;

/// Cleanup: trim entries scored at or below the cutoff from every index.
///
/// KEYS[1] = all-tasks index, KEYS[2] = index-name registry.
/// ARGV[1] = cutoff score (epoch ms).
/// Returns: number of entries removed from the all-tasks index.
const LUA_CLEANUP: &str = r#"
local removed = redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
for _, name in ipairs(redis.call('SMEMBERS', KEYS[2])) do
    if name ~= KEYS[1] then
        redis.call('ZREMRANGEBYSCORE', name, '-inf', ARGV[1])
        if redis.call('ZCARD', name) == 0 then
            redis.call('SREM', KEYS[2], name)
        end
    end
end
return removed
"#;

// ---------------------------------------------------------------------------
// RedisBackend struct
// ---------------------------------------------------------------------------

/// Redis storage backend for task metadata.
///
/// This backend is a thin adapter with **no domain logic**. Serialization
/// and the retention policy applied to each write live in
/// [`GenericMetadataStore`](crate::store::generic::GenericMetadataStore).
/// The backend's own `retention` only drives index trimming and should
/// match the store's.
///
/// # Connection Model
///
/// `RedisBackend` holds a [`MultiplexedConnection`], which is cheap to
/// clone; all clones share one TCP connection. Each method clones it.
#[derive(Debug, Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    key_prefix: String,
    retention: Duration,
}

impl RedisBackend {
    /// Creates a backend by connecting to Redis at the given URL.
    ///
    /// The URL format is `redis://[:<password>@]<host>:<port>[/<db>]`.
    /// Fails fast if the connection cannot be established.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the client cannot be created or
    /// the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let client = ::redis::Client::open(url).map_err(|e| StorageError::Backend {
            message: format!("failed to create Redis client: {e}"),
            source: Some(Box::new(e)),
        })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Backend {
                message: format!("failed to connect to Redis: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::with_connection(conn))
    }

    /// Creates a backend with a pre-built multiplexed connection.
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            retention: DEFAULT_RETENTION,
        }
    }

    /// Sets a custom key prefix (builder pattern).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the window after which index entries are trimmed (builder
    /// pattern).
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

impl RedisBackend {
    fn record_key(&self, id: &str) -> String {
        format!("{}:task:{}", self.key_prefix, id)
    }

    fn index_key(&self, index: &str) -> String {
        format!("{}:idx:{}", self.key_prefix, index)
    }

    fn registry_key(&self) -> String {
        format!("{}:idx:names", self.key_prefix)
    }
}

fn map_redis_error(err: ::redis::RedisError, key: &str) -> StorageError {
    StorageError::Backend {
        message: format!("Redis error for key {key}: {err}"),
        source: Some(Box::new(err)),
    }
}

// ---------------------------------------------------------------------------
// StorageBackend implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let key = self.record_key(id);
        let data: Option<Vec<u8>> = self
            .conn
            .clone()
            .get(&key)
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        data.ok_or_else(|| StorageError::NotFound { id: id.to_string() })
    }

    async fn put_indexed(
        &self,
        id: &str,
        data: &[u8],
        index: &str,
        created_at_ms: i64,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let key = self.record_key(id);
        let data_str = std::str::from_utf8(data).map_err(|e| StorageError::Backend {
            message: format!("data is not valid UTF-8: {e}"),
            source: Some(Box::new(e)),
        })?;
        let ttl_ms = ttl
            .map(|ttl| ttl.as_millis().max(1).to_string())
            .unwrap_or_default();

        let script = Script::new(LUA_PUT_INDEXED);
        let _: i64 = script
            .key(&key)
            .key(self.index_key(ALL_TASKS_INDEX))
            .key(self.index_key(index))
            .key(self.registry_key())
            .arg(data_str)
            .arg(&ttl_ms)
            .arg(id)
            .arg(created_at_ms)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| map_redis_error(e, &key))?;
        Ok(())
    }

    async fn list_ids(&self, index: Option<&str>) -> Result<Vec<String>, StorageError> {
        let key = self.index_key(index.unwrap_or(ALL_TASKS_INDEX));
        self.conn
            .clone()
            .zrange(&key, 0, -1)
            .await
            .map_err(|e| map_redis_error(e, &key))
    }

    /// Record keys expire through `PX`; this only trims index entries older
    /// than the retention window.
    async fn cleanup_expired(&self) -> Result<usize, StorageError> {
        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now()
            .timestamp_millis()
            .saturating_sub(retention_ms);
        let all_key = self.index_key(ALL_TASKS_INDEX);

        let script = Script::new(LUA_CLEANUP);
        let removed: i64 = script
            .key(&all_key)
            .key(self.registry_key())
            .arg(cutoff)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| map_redis_error(e, &all_key))?;
        Ok(usize::try_from(removed).unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Integration tests -- Redis backend contract tests
// ---------------------------------------------------------------------------
