//! # Task abstractions and specifications.
//!
//! - [`Task`] - trait for async cancelable tasks
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskSpec`] - task plus its [`Role`] in the group

mod spec;
mod task;
mod task_fn;

pub use spec::{Role, TaskSpec};
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;
