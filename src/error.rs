//! Error types used by the loopvisor runtime and its member tasks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors surfaced by the group supervisor to the caller of
//!   [`Supervisor::wait_all`](crate::Supervisor::wait_all).
//! - [`TaskError`]: errors returned by individual member tasks.
//!
//! Cancellation is modelled as [`TaskError::Canceled`]: it is expected, absorbed
//! at the task boundary and never surfaces as a [`RuntimeError`].

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the group supervisor.
///
/// Only genuinely unexpected outcomes end up here: a failing run loop, a failing
/// member, stragglers that outlived the grace period, or misuse of the group API.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The bridge task's foreign run loop failed. Siblings were still cancelled.
    #[error("run loop of '{task}' failed: {error}")]
    ForeignLoop {
        /// Name of the bridge task.
        task: String,
        /// The recorded task error.
        error: TaskError,
    },

    /// A non-bridge member failed. Remaining members were **not** cancelled.
    #[error("member '{task}' failed: {error}")]
    MemberFailed {
        /// Name of the failing member.
        task: String,
        /// The recorded task error.
        error: TaskError,
    },

    /// Members were still running when the grace period after the bridge exit ran out.
    #[error("grace {grace:?} exceeded after run loop exit; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the members that had to be aborted.
        stuck: Vec<String>,
    },

    /// More than one spec carried the bridge role.
    #[error("a group accepts at most one bridge task, got {count}")]
    DuplicateBridge {
        /// Number of bridge specs passed to spawn.
        count: usize,
    },

    /// Two specs shared the same task name.
    #[error("task '{name}' is declared twice")]
    DuplicateTask {
        /// The duplicated name.
        name: String,
    },

    /// `spawn` was called on a group that already spawned its members.
    #[error("group members were already spawned")]
    AlreadySpawned,

    /// `wait_all` was called before `spawn`, or after the group was drained.
    #[error("group has no spawned members to wait for")]
    NotSpawned,

    /// The configured scheduler could not be built.
    #[error("failed to build scheduler: {0}")]
    Scheduler(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use loopvisor::RuntimeError;
    ///
    /// let err = RuntimeError::DuplicateBridge { count: 2 };
    /// assert_eq!(err.as_label(), "runtime_duplicate_bridge");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ForeignLoop { .. } => "runtime_foreign_loop",
            RuntimeError::MemberFailed { .. } => "runtime_member_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::DuplicateBridge { .. } => "runtime_duplicate_bridge",
            RuntimeError::DuplicateTask { .. } => "runtime_duplicate_task",
            RuntimeError::AlreadySpawned => "runtime_already_spawned",
            RuntimeError::NotSpawned => "runtime_not_spawned",
            RuntimeError::Scheduler(_) => "runtime_scheduler",
        }
    }
}

/// # Errors produced by member task execution.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task observed its cancellation token and unwound.
    #[error("context cancelled")]
    Canceled,

    /// The foreign run loop driven by a bridge task failed or panicked.
    #[error("foreign run loop error: {error}")]
    ForeignLoop {
        /// The engine's error message.
        error: String,
    },

    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error, including panics caught at the task boundary.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use loopvisor::TaskError;
    ///
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Canceled => "task_canceled",
            TaskError::ForeignLoop { .. } => "task_foreign_loop",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
        }
    }

    /// True for the cooperative cancellation signal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}
