//! # Member and group state machines.
//!
//! ```text
//! TaskState:  Pending ──► Running ──► Completed
//!                              ├────► Cancelled
//!                              └────► Failed
//!
//! Phase:      Spawning ──► Running ──► Draining ──► Done
//! ```
//!
//! Both are stored in atomics and only ever move forward; a transition that
//! would go backwards (or leave a terminal state) is rejected.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Identity of a member inside its group (spawn order, starting at 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Position of the member in the spec list passed to spawn.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of one member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl TaskState {
    /// True for Completed, Cancelled and Failed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }

    /// Short snake_case label.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Cancelled => "cancelled",
            TaskState::Failed => "failed",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Completed,
            3 => TaskState::Cancelled,
            _ => TaskState::Failed,
        }
    }

    fn can_advance_to(self, next: TaskState) -> bool {
        match self {
            TaskState::Pending => next != TaskState::Pending,
            TaskState::Running => next.is_terminal(),
            _ => false,
        }
    }
}

/// Atomic, forward-only [`TaskState`] holder.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(TaskState::Pending as u8))
    }

    pub fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next` if that is a legal forward transition.
    ///
    /// Returns `false` (and changes nothing) otherwise.
    pub fn advance(&self, next: TaskState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                TaskState::from_u8(raw)
                    .can_advance_to(next)
                    .then_some(next as u8)
            })
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate phase of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Members are being created.
    Spawning = 0,
    /// Every member is pending or running.
    Running = 1,
    /// Some members are terminal, some are not.
    Draining = 2,
    /// Every member is terminal.
    Done = 3,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Phase::Spawning,
            1 => Phase::Running,
            2 => Phase::Draining,
            _ => Phase::Done,
        }
    }
}

/// Atomic, forward-only [`Phase`] holder.
#[derive(Debug)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Phase::Spawning as u8))
    }

    pub(crate) fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Raises the phase to `next`; never lowers it.
    pub(crate) fn raise(&self, next: Phase) {
        self.0.fetch_max(next as u8, Ordering::AcqRel);
    }
}
