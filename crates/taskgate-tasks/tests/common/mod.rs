//! Test doubles shared by the coordinator and property tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use taskgate_tasks::execution::{ExecutionBackend, ExecutionError, LiveState, Submission};
use taskgate_tasks::store::memory::InMemoryMetadataStore;
use taskgate_tasks::store::MetadataStore;
use taskgate_tasks::{TaskCoordinator, TaskError, TaskRecord, TaskState};

/// Execution backend whose answers are set by the test.
#[derive(Default)]
pub struct FakeBackend {
    counter: AtomicUsize,
    states: Mutex<HashMap<String, LiveState>>,
    accepted: Mutex<Vec<Submission>>,
    pub fail_accept: AtomicBool,
    pub fail_live_state: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Overrides the live state reported for `id`.
    pub fn set_live(&self, id: &str, live: LiveState) {
        self.states.lock().insert(id.to_string(), live);
    }

    /// Whether the backend has ever accepted `id`.
    pub fn knows(&self, id: &str) -> bool {
        self.states.lock().contains_key(id)
    }

    pub fn accepted(&self) -> Vec<Submission> {
        self.accepted.lock().clone()
    }
}

#[async_trait]
impl ExecutionBackend for FakeBackend {
    async fn accept(&self, submission: &Submission) -> Result<String, ExecutionError> {
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(ExecutionError::Unavailable("broker unreachable".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("task-{n}");
        self.states
            .lock()
            .insert(id.clone(), LiveState::new(TaskState::Pending));
        self.accepted.lock().push(submission.clone());
        Ok(id)
    }

    async fn live_state(&self, task_id: &str) -> Result<LiveState, ExecutionError> {
        if self.fail_live_state.load(Ordering::SeqCst) {
            return Err(ExecutionError::Unavailable("result backend timeout".to_string()));
        }
        self.states
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownTask {
                task_id: task_id.to_string(),
            })
    }
}

/// In-memory metadata store with switchable failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryMetadataStore,
    pub fail_put: AtomicBool,
    pub fail_list: AtomicBool,
    pub puts: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl MetadataStore for FlakyStore {
    async fn put(&self, record: &TaskRecord) -> Result<(), TaskError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(TaskError::MetadataStore("write refused".to_string()));
        }
        self.inner.put(record).await
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.inner.get(task_id).await
    }

    async fn list_ids(&self, status: Option<TaskState>) -> Result<Vec<String>, TaskError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(TaskError::MetadataStore("index unreadable".to_string()));
        }
        self.inner.list_ids(status).await
    }

    async fn cleanup_expired(&self) -> Result<usize, TaskError> {
        self.inner.cleanup_expired().await
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<FlakyStore>,
    pub coordinator: TaskCoordinator,
}

pub fn harness() -> Harness {
    let backend = FakeBackend::new();
    let store = FlakyStore::new();
    let coordinator = TaskCoordinator::new(backend.clone(), store.clone());
    Harness {
        backend,
        store,
        coordinator,
    }
}
