//! Wire types for the task gateway.
//!
//! - [`task`] - [`TaskState`], the lifecycle states reported by backends
//! - [`args`] - [`TaskArg`] and [`ArgType`], typed submission arguments
//! - [`view`] - [`TaskView`] and [`SubmitTask`], the request/response shapes

pub mod args;
pub mod task;
pub mod view;

pub use args::*;
pub use task::*;
pub use view::*;
