//! # Task abstraction.
//!
//! A [`Task`] is a named factory of futures. Each call to [`Task::spawn`]
//! produces a fresh future that receives the member's [`CancellationToken`]
//! and should observe it at its suspension points.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use loopvisor::{BoxTaskFuture, Task, TaskError};
///
/// struct Demo;
///
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             ctx.cancelled().await;
///             Err(TaskError::Canceled)
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name (unique inside a group).
    fn name(&self) -> &str;

    /// Creates the future that runs the task body.
    ///
    /// Returning `Err(TaskError::Canceled)` records the member as cancelled.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}
