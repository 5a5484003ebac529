//! Task lifecycle and metadata coordination for the taskgate gateway.
//!
//! This crate owns the part of the gateway that keeps two independently
//! owned sources of truth in step: the execution backend, which runs tasks
//! and is authoritative for their live state, and the metadata store, which
//! is authoritative for their existence and identity.
//!
//! # Overview
//!
//! A submission is first accepted by an [`ExecutionBackend`], which
//! allocates the task ID. Only then is a `pending` [`TaskRecord`] written to
//! the [`MetadataStore`] together with its status index entry. Status reads
//! look the record up in the store and overlay the backend's live state;
//! listings read a slice of the status index and return stored fields only.
//!
//! # Module Organization
//!
//! - [`coordinator`] - The [`TaskCoordinator`] orchestrating submit, status and listing
//! - [`store`] - Metadata store trait, generic implementation, and backends
//! - [`execution`] - Execution backend contract and the in-process backend
//! - [`domain`] - The stored [`TaskRecord`]
//! - [`types`] - Wire types (task state, typed arguments, response view)
//! - [`error`] - The [`TaskError`] taxonomy
//! - [`constants`] - Retention, pagination and key constants

pub mod constants;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod execution;
pub mod store;
pub mod types;

pub use coordinator::{ListQuery, TaskCoordinator};
pub use domain::TaskRecord;
pub use error::TaskError;
pub use execution::{ExecutionBackend, ExecutionError, LiveState, Submission};
pub use store::MetadataStore;
pub use types::*;
