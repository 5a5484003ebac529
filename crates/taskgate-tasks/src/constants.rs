//! Constants shared by the coordinator, the stores and the gateway.

use std::time::Duration;

/// How long a task record is retained after creation (72 hours).
///
/// Expiry is enforced by the store itself; the coordinator never deletes.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(72 * 60 * 60);

/// How long the in-process backend keeps live states around (72 hours).
pub const DEFAULT_RESULTS_EXPIRE_IN: Duration = Duration::from_secs(72 * 60 * 60);

/// Page size used when a listing request does not carry a usable limit.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Number of tasks the in-process backend runs at the same time.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Queue name used when a submission carries no routing hint.
pub const DEFAULT_QUEUE: &str = "default";

/// Key prefix used by the Redis backend unless overridden.
pub const DEFAULT_KEY_PREFIX: &str = "taskgate";

/// Index name under which every record is enumerable regardless of status.
pub const ALL_TASKS_INDEX: &str = "all";
