//! Bookkeeping for one spawned member.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::core::state::{StateCell, TaskId, TaskState};
use crate::tasks::Role;

pub(crate) struct Member {
    pub(crate) id: TaskId,
    pub(crate) name: Arc<str>,
    pub(crate) role: Role,
    /// Child of the group token; only the supervisor cancels it.
    pub(crate) token: CancellationToken,
    pub(crate) state: StateCell,
    cancel_requested: AtomicBool,
    error: Mutex<Option<String>>,
}

impl Member {
    pub(crate) fn new(id: TaskId, name: &str, role: Role, token: CancellationToken) -> Self {
        Self {
            id,
            name: Arc::from(name),
            role,
            token,
            state: StateCell::new(),
            cancel_requested: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    /// Flips the token once. Returns `false` for terminal members and repeats.
    pub(crate) fn request_cancel(&self) -> bool {
        if self.state.get().is_terminal() {
            return false;
        }
        if self.cancel_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub(crate) fn record_error(&self, message: String) {
        match self.error.lock() {
            Ok(mut slot) => *slot = Some(message),
            Err(poisoned) => *poisoned.into_inner() = Some(message),
        }
    }

    pub(crate) fn report(&self) -> MemberReport {
        let error = match self.error.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        MemberReport {
            id: self.id,
            name: self.name.to_string(),
            role: self.role,
            state: self.state.get(),
            error,
        }
    }
}

/// Snapshot of one member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberReport {
    pub id: TaskId,
    pub name: String,
    pub role: Role,
    pub state: TaskState,
    /// Error message for failed members.
    pub error: Option<String>,
}

/// Snapshot of a whole group, in spawn order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupReport {
    pub members: Vec<MemberReport>,
}

impl GroupReport {
    /// State of the member called `name`.
    pub fn state(&self, name: &str) -> Option<TaskState> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.state)
    }

    /// True once every member is terminal.
    pub fn all_terminal(&self) -> bool {
        self.members.iter().all(|m| m.state.is_terminal())
    }

    /// Names of members currently in `state`.
    pub fn names_in(&self, state: TaskState) -> Vec<&str> {
        self.members
            .iter()
            .filter(|m| m.state == state)
            .map(|m| m.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent_and_skips_terminal() {
        let m = Member::new(TaskId(0), "a", Role::Member, CancellationToken::new());
        assert!(m.request_cancel());
        assert!(!m.request_cancel());
        assert!(m.token.is_cancelled());

        let done = Member::new(TaskId(1), "b", Role::Member, CancellationToken::new());
        done.state.advance(TaskState::Running);
        done.state.advance(TaskState::Completed);
        assert!(!done.request_cancel());
        assert!(!done.token.is_cancelled());
    }
}
