//! Domain types for the stored task representation.
//!
//! [`TaskRecord`] is what the metadata store persists. It is kept apart
//! from the wire [`TaskView`](crate::types::TaskView) so the creation-time
//! status and the live status reported by the execution backend never share
//! a field.

pub mod record;

pub use record::*;
