//! In-process execution backend.
//!
//! [`InProcessBackend`] stands in for a message broker plus worker pool:
//! accepted tasks are spawned on the tokio runtime, at most `concurrency` at
//! a time, and walk `pending -> received -> started -> success | failure`.
//! Live states are kept in a [`DashMap`] and expire `results_expire_in`
//! after the task finishes.
//!
//! Failed handlers are not retried.
//!
//! # Examples
//!
//! ```
//! use taskgate_tasks::execution::{handler_fn, ExecutionBackend, InProcessBackend, Submission};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = InProcessBackend::new()
//!     .with_concurrency(4)
//!     .register("ping", handler_fn(|_args| async { Ok(json!("pong")) }));
//!
//! let id = backend.accept(&Submission::new("ping", vec![])).await.unwrap();
//! assert!(!id.is_empty());
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_QUEUE, DEFAULT_RESULTS_EXPIRE_IN};
use crate::types::{validate_args, TaskArg, TaskState};

use super::{ExecutionBackend, ExecutionError, LiveState, Submission};

/// A named unit of work the in-process backend can run.
///
/// Returns the task result, or a failure description.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Runs the task with its submitted arguments.
    async fn call(&self, args: Vec<TaskArg>) -> Result<Value, String>;
}

/// Adapts an async closure into a [`TaskHandler`].
pub struct FnHandler<F> {
    func: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Wraps `func` as a [`TaskHandler`].
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(Vec<TaskArg>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    FnHandler { func }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Vec<TaskArg>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    async fn call(&self, args: Vec<TaskArg>) -> Result<Value, String> {
        (self.func)(args).await
    }
}

#[derive(Debug, Clone)]
struct TaskEntry {
    live: LiveState,
    queue: String,
    error: Option<String>,
    finished_at: Option<Instant>,
}

impl TaskEntry {
    fn is_expired(&self, now: Instant, expire_in: Duration) -> bool {
        self.finished_at
            .is_some_and(|at| now.saturating_duration_since(at) >= expire_in)
    }
}

type StateMap = Arc<DashMap<String, TaskEntry>>;

/// Execution backend running registered handlers on the tokio runtime.
pub struct InProcessBackend {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    states: StateMap,
    permits: Arc<Semaphore>,
    default_queue: String,
    results_expire_in: Duration,
}

impl fmt::Debug for InProcessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessBackend")
            .field("handlers", &self.task_names())
            .field("tracked", &self.states.len())
            .field("default_queue", &self.default_queue)
            .field("results_expire_in", &self.results_expire_in)
            .finish_non_exhaustive()
    }
}

impl InProcessBackend {
    /// Creates a backend with no handlers, 10 concurrent slots, the
    /// `default` queue and 72 hour result expiry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            states: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            default_queue: DEFAULT_QUEUE.to_string(),
            results_expire_in: DEFAULT_RESULTS_EXPIRE_IN,
        }
    }

    /// Sets how many tasks may run at the same time (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(concurrency.max(1)));
        self
    }

    /// Sets the queue recorded for submissions without a routing hint.
    pub fn with_default_queue(mut self, queue: impl Into<String>) -> Self {
        self.default_queue = queue.into();
        self
    }

    /// Sets how long a finished task's state stays readable.
    pub fn with_results_expire_in(mut self, expire_in: Duration) -> Self {
        self.results_expire_in = expire_in;
        self
    }

    /// Registers `handler` under `name`, replacing any previous one.
    pub fn register(
        mut self,
        name: impl Into<String>,
        handler: impl TaskHandler + 'static,
    ) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Names of the registered handlers, sorted.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Queue a tracked task was routed to.
    pub fn queue_of(&self, task_id: &str) -> Option<String> {
        self.states.get(task_id).map(|entry| entry.queue.clone())
    }

    /// Failure description of a task that ended in `failure`.
    ///
    /// Not part of [`ExecutionBackend`]: status reads only expose the stored
    /// error. Meant for diagnostics and tests.
    pub fn failure_reason(&self, task_id: &str) -> Option<String> {
        self.states.get(task_id).and_then(|entry| entry.error.clone())
    }

    /// Drops finished tasks whose state has outlived `results_expire_in`.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.states.len();
        self.states
            .retain(|_, entry| !entry.is_expired(now, self.results_expire_in));
        before.saturating_sub(self.states.len())
    }

    fn transition(states: &StateMap, task_id: &str, status: TaskState) {
        if let Some(mut entry) = states.get_mut(task_id) {
            entry.live = LiveState::new(status);
        }
    }

    fn finish(states: &StateMap, task_id: &str, outcome: Result<Value, String>) {
        if let Some(mut entry) = states.get_mut(task_id) {
            match outcome {
                Ok(result) => {
                    entry.live = LiveState::succeeded(result);
                },
                Err(error) => {
                    tracing::warn!(task_id, error = %error, "task failed");
                    entry.live = LiveState::new(TaskState::Failure);
                    entry.error = Some(error);
                },
            }
            entry.finished_at = Some(Instant::now());
        }
    }
}

impl Default for InProcessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBackend for InProcessBackend {
    async fn accept(&self, submission: &Submission) -> Result<String, ExecutionError> {
        let handler = self.handlers.get(&submission.name).cloned().ok_or_else(|| {
            ExecutionError::Rejected(format!("no task registered as {:?}", submission.name))
        })?;
        validate_args(&submission.args).map_err(|e| ExecutionError::Rejected(e.to_string()))?;

        let task_id = Uuid::new_v4().to_string();
        let queue = submission
            .routing
            .clone()
            .unwrap_or_else(|| self.default_queue.clone());
        self.states.insert(
            task_id.clone(),
            TaskEntry {
                live: LiveState::new(TaskState::Pending),
                queue: queue.clone(),
                error: None,
                finished_at: None,
            },
        );
        tracing::debug!(task_id = %task_id, name = %submission.name, queue = %queue, "task queued");

        let states = Arc::clone(&self.states);
        let permits = Arc::clone(&self.permits);
        let args = submission.args.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    Self::finish(&states, &id, Err("worker pool closed".to_string()));
                    return;
                },
            };
            Self::transition(&states, &id, TaskState::Received);
            Self::transition(&states, &id, TaskState::Started);
            let run = tokio::spawn(async move { handler.call(args).await });
            let outcome = match run.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    tracing::error!(task_id = %id, "task handler panicked");
                    Err("task panicked".to_string())
                },
                Err(_) => Err("task cancelled".to_string()),
            };
            Self::finish(&states, &id, outcome);
        });

        Ok(task_id)
    }

    async fn live_state(&self, task_id: &str) -> Result<LiveState, ExecutionError> {
        let now = Instant::now();
        match self.states.get(task_id) {
            Some(entry) if !entry.is_expired(now, self.results_expire_in) => {
                Ok(entry.live.clone())
            },
            _ => Err(ExecutionError::UnknownTask {
                task_id: task_id.to_string(),
            }),
        }
    }
}
