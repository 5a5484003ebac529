//! Coordinator behavior against controllable backend and store doubles.

mod common;

use std::sync::atomic::Ordering;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::harness;
use taskgate_tasks::execution::{LiveState, Submission};
use taskgate_tasks::store::MetadataStore;
use taskgate_tasks::{ListQuery, TaskArg, TaskError, TaskState};

fn echo(value: &str) -> Submission {
    Submission::new("echo", vec![TaskArg::new("string", json!(value))])
}

// ---- submit ----

#[tokio::test]
async fn submitted_task_is_immediately_readable_as_pending() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    assert!(!id.is_empty());

    let view = h.coordinator.get_status(&id).await.unwrap();
    assert_eq!(view.id, id);
    assert_eq!(view.name.as_deref(), Some("echo"));
    assert_eq!(view.status, TaskState::Pending);
    assert!(view.result.is_none());
    assert!(view.created_at.is_some());
}

#[tokio::test]
async fn submit_records_name_and_args() {
    let h = harness();
    let id = h.coordinator.submit(echo("payload")).await.unwrap();

    let record = h.store.get(&id).await.unwrap();
    assert_eq!(record.name, "echo");
    assert_eq!(record.args, vec![TaskArg::new("string", json!("payload"))]);
    assert_eq!(record.status_at_creation, TaskState::Pending);
}

#[tokio::test]
async fn submit_passes_routing_to_backend() {
    let h = harness();
    h.coordinator
        .submit(echo("x").with_routing("priority"))
        .await
        .unwrap();
    h.coordinator.submit(echo("y")).await.unwrap();

    let accepted = h.backend.accepted();
    assert_eq!(accepted[0].routing.as_deref(), Some("priority"));
    assert_eq!(accepted[1].routing, None);
}

#[tokio::test]
async fn backend_rejection_writes_nothing() {
    let h = harness();
    h.backend.fail_accept.store(true, Ordering::SeqCst);

    let err = h.coordinator.submit(echo("hi")).await.unwrap_err();
    assert!(matches!(err, TaskError::ExecutionBackend(_)), "got {err:?}");
    assert_eq!(h.store.puts.load(Ordering::SeqCst), 0);
    assert!(h.store.list_ids(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn store_failure_after_accept_orphans_task() {
    let h = harness();
    h.store.fail_put.store(true, Ordering::SeqCst);

    let err = h.coordinator.submit(echo("hi")).await.unwrap_err();
    let TaskError::MetadataPersist { task_id, message } = &err else {
        panic!("expected MetadataPersist, got {err:?}");
    };
    assert!(err.is_orphaned());
    assert_eq!(message, "write refused");
    assert!(h.backend.knows(task_id));

    let lookup = h.coordinator.get_status(task_id).await.unwrap_err();
    assert!(lookup.is_not_found());
}

#[tokio::test]
async fn empty_name_is_rejected_before_backend() {
    let h = harness();
    let err = h
        .coordinator
        .submit(Submission::new("", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidRequest(_)));
    assert!(h.backend.accepted().is_empty());
}

// ---- get_status ----

#[tokio::test]
async fn live_state_takes_precedence_over_stored_status() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    h.backend.set_live(&id, LiveState::succeeded(json!(42)));

    let view = h.coordinator.get_status(&id).await.unwrap();
    assert_eq!(view.status, TaskState::Success);
    assert_eq!(view.result, Some(json!(42)));
}

#[tokio::test]
async fn in_flight_state_carries_no_result() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    h.backend.set_live(&id, LiveState::new(TaskState::Started));

    let view = h.coordinator.get_status(&id).await.unwrap();
    assert_eq!(view.status, TaskState::Started);
    assert!(view.result.is_none());
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let h = harness();
    let err = h.coordinator.get_status("does-not-exist").await.unwrap_err();
    assert!(
        matches!(err, TaskError::NotFound { ref task_id } if task_id == "does-not-exist"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn backend_failure_aborts_status_read() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    h.backend.fail_live_state.store(true, Ordering::SeqCst);

    let err = h.coordinator.get_status(&id).await.unwrap_err();
    assert!(matches!(err, TaskError::ExecutionBackend(_)), "got {err:?}");
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    h.backend.set_live(&id, LiveState::succeeded(json!({"echo": "hi"})));

    let first = h.coordinator.get_status(&id).await.unwrap();
    let second = h.coordinator.get_status(&id).await.unwrap();
    assert_eq!(first, second);
}

// ---- list_tasks ----

#[tokio::test]
async fn listing_uses_stored_status_not_live() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    h.backend.set_live(&id, LiveState::succeeded(json!(1)));

    let tasks = h.coordinator.list_tasks(&ListQuery::default()).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskState::Pending);
    assert!(tasks[0].result.is_none());
}

#[tokio::test]
async fn listing_skips_records_that_vanished() {
    let h = harness();
    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(h.coordinator.submit(echo(&i.to_string())).await.unwrap());
    }
    assert!(h.store.inner.backend().evict(&ids[1]));

    let tasks = h.coordinator.list_tasks(&ListQuery::default()).await.unwrap();
    let listed: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(listed, vec![ids[0].as_str(), ids[2].as_str(), ids[3].as_str()]);
}

#[tokio::test]
async fn enumeration_failure_fails_listing() {
    let h = harness();
    h.coordinator.submit(echo("hi")).await.unwrap();
    h.store.fail_list.store(true, Ordering::SeqCst);

    let err = h
        .coordinator
        .list_tasks(&ListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::MetadataStore(_)), "got {err:?}");
}

#[tokio::test]
async fn offset_past_end_is_empty() {
    let h = harness();
    for _ in 0..3 {
        h.coordinator.submit(echo("x")).await.unwrap();
    }
    let tasks = h
        .coordinator
        .list_tasks(&ListQuery::default().with_offset(3))
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn pages_do_not_overlap() {
    let h = harness();
    for _ in 0..5 {
        h.coordinator.submit(echo("x")).await.unwrap();
    }
    let first = h
        .coordinator
        .list_tasks(&ListQuery::default().with_limit(2))
        .await
        .unwrap();
    let second = h
        .coordinator
        .list_tasks(&ListQuery::default().with_limit(2).with_offset(2))
        .await
        .unwrap();
    let third = h
        .coordinator
        .list_tasks(&ListQuery::default().with_limit(2).with_offset(4))
        .await
        .unwrap();

    assert_eq!((first.len(), second.len(), third.len()), (2, 2, 1));
    let mut all: Vec<String> = first
        .into_iter()
        .chain(second)
        .chain(third)
        .map(|t| t.id)
        .collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn finished_tasks_stay_indexed_as_pending() {
    let h = harness();
    let id = h.coordinator.submit(echo("hi")).await.unwrap();
    h.backend.set_live(&id, LiveState::succeeded(json!("hi")));

    let by_success = h
        .coordinator
        .list_tasks(&ListQuery::default().with_status(TaskState::Success))
        .await
        .unwrap();
    assert!(by_success.is_empty());

    let by_pending = h
        .coordinator
        .list_tasks(&ListQuery::default().with_status(TaskState::Pending))
        .await
        .unwrap();
    assert_eq!(by_pending.len(), 1);
    assert_eq!(by_pending[0].id, id);
}
