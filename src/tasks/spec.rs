//! # Member specification.
//!
//! A [`TaskSpec`] pairs a task with its [`Role`] inside the group. Exactly the
//! bridge role carries the group-shutdown semantics: when that member becomes
//! terminal, every other member is cancelled.

use std::sync::Arc;

use crate::bridge::{BridgeTask, ForeignLoop};
use crate::tasks::task::TaskRef;

/// Role of a member inside its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Drives the foreign run loop; its exit cancels every sibling.
    Bridge,
    /// Ordinary member; its completion or failure never cancels anyone.
    Member,
}

/// Specification for one group member.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use loopvisor::{Role, TaskError, TaskFn, TaskSpec};
///
/// let spec = TaskSpec::member(TaskFn::arc("idle", |ctx: CancellationToken| async move {
///     ctx.cancelled().await;
///     Err::<(), _>(TaskError::Canceled)
/// }));
/// assert_eq!(spec.role(), Role::Member);
/// assert_eq!(spec.name(), "idle");
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    task: TaskRef,
    role: Role,
}

impl TaskSpec {
    /// Creates a spec with an explicit role.
    pub fn new(task: TaskRef, role: Role) -> Self {
        Self { task, role }
    }

    /// Ordinary member.
    pub fn member(task: TaskRef) -> Self {
        Self::new(task, Role::Member)
    }

    /// Bridge member driving the given foreign run loop.
    pub fn bridge(name: impl Into<String>, run_loop: impl ForeignLoop) -> Self {
        Self::new(Arc::new(BridgeTask::new(name, run_loop)), Role::Bridge)
    }

    /// Returns reference to the task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Convenience: returns the task name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Returns the member role.
    pub fn role(&self) -> Role {
        self.role
    }
}
