//! Property-based tests using proptest.
//!
//! Covers page sizing over arbitrary index sizes, listing resilience when
//! records disappear after enumeration, the status-index staleness that
//! keeps every record filed under `pending`, and argument validation on
//! arbitrary JSON.

mod common;

use proptest::prelude::*;
use serde_json::{json, Value};

use common::harness;
use taskgate_tasks::execution::{LiveState, Submission};
use taskgate_tasks::{ArgType, ListQuery, TaskArg, TaskState};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn arb_live_state() -> impl Strategy<Value = LiveState> {
    prop::sample::select(TaskState::ALL.to_vec()).prop_map(|status| {
        if status == TaskState::Success {
            LiveState::succeeded(json!("done"))
        } else {
            LiveState::new(status)
        }
    })
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<u64>().prop_map(|n| json!(n)),
        (-1.0e40f64..1.0e40f64).prop_map(|f| json!(f)),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(2, 8, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::Array)
    })
}

fn arb_type_tag() -> impl Strategy<Value = String> {
    let scalar = prop::sample::select(vec![
        "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
        "uint32", "uint64", "float32", "float64",
    ]);
    (scalar, any::<bool>()).prop_map(|(tag, slice)| {
        if slice {
            format!("[]{tag}")
        } else {
            tag.to_string()
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A page holds exactly min(limit, max(0, n - offset)) entries.
    #[test]
    fn page_size_is_bounded(n in 0usize..25, limit in 1usize..15, offset in 0usize..30) {
        let listed = runtime().block_on(async {
            let h = harness();
            for _ in 0..n {
                h.coordinator.submit(Submission::new("noop", vec![])).await.unwrap();
            }
            h.coordinator
                .list_tasks(&ListQuery::default().with_limit(limit).with_offset(offset))
                .await
                .unwrap()
        });
        prop_assert_eq!(listed.len(), limit.min(n.saturating_sub(offset)));
    }

    /// Dropping k of n records shrinks an unpaged listing by exactly k.
    #[test]
    fn vanished_records_are_skipped(n in 1usize..15, drop_mask in prop::collection::vec(any::<bool>(), 15)) {
        let (listed, kept) = runtime().block_on(async {
            let h = harness();
            let mut kept = 0;
            for i in 0..n {
                let id = h.coordinator.submit(Submission::new("noop", vec![])).await.unwrap();
                if drop_mask[i] {
                    h.store.inner.backend().evict(&id);
                } else {
                    kept += 1;
                }
            }
            let listed = h
                .coordinator
                .list_tasks(&ListQuery::default().with_limit(n))
                .await
                .unwrap();
            (listed.len(), kept)
        });
        prop_assert_eq!(listed, kept);
    }

    /// Whatever the backend reports, records are only found under `pending`.
    #[test]
    fn records_stay_indexed_under_creation_status(
        lives in prop::collection::vec(arb_live_state(), 1..8),
        filter in prop::sample::select(TaskState::ALL.to_vec()),
    ) {
        let (listed, total) = runtime().block_on(async {
            let h = harness();
            for live in &lives {
                let id = h.coordinator.submit(Submission::new("noop", vec![])).await.unwrap();
                h.backend.set_live(&id, live.clone());
            }
            let listed = h
                .coordinator
                .list_tasks(&ListQuery::default().with_status(filter).with_limit(100))
                .await
                .unwrap();
            (listed, lives.len())
        });

        if filter == TaskState::Pending {
            prop_assert_eq!(listed.len(), total);
            prop_assert!(listed.iter().all(|t| t.status == TaskState::Pending));
        } else {
            prop_assert!(listed.is_empty());
        }
    }

    /// Status reads always show the backend's state, never the stored one.
    #[test]
    fn status_read_reflects_live_state(live in arb_live_state()) {
        let view = runtime().block_on(async {
            let h = harness();
            let id = h.coordinator.submit(Submission::new("noop", vec![])).await.unwrap();
            h.backend.set_live(&id, live.clone());
            h.coordinator.get_status(&id).await.unwrap()
        });
        prop_assert_eq!(view.status, live.status);
        prop_assert_eq!(view.result.is_some(), live.status == TaskState::Success);
    }

    /// Validation never panics, and a valid tag accepts exactly what
    /// `ArgType::accepts` accepts.
    #[test]
    fn argument_validation_is_total(tag in arb_type_tag(), value in arb_json()) {
        let arg = TaskArg::new(tag.clone(), value.clone());
        let parsed: ArgType = tag.parse().unwrap();
        prop_assert_eq!(arg.validate().is_ok(), parsed.accepts(&value));
    }

    /// Unknown tags are always rejected.
    #[test]
    fn unknown_tags_are_rejected(tag in "[a-z]{1,6}", value in arb_json()) {
        prop_assume!(tag.parse::<ArgType>().is_err());
        prop_assert!(TaskArg::new(tag, value).validate().is_err());
    }
}
