//! # Cohort: the fixed member list shared by the supervisor and every runner.
//!
//! The bridge member's runner uses it to cancel its siblings the moment the run
//! loop returns, whether or not anyone is waiting on the group yet.
//!
//! ```text
//! bridge runner: run_member(..) ─► Cohort::bridge_exited
//!                                    ├─► mark exit instant (grace starts here)
//!                                    ├─► publish RunLoopExited
//!                                    └─► cancel(id) for every other member
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::{
    member::Member,
    state::{TaskId, TaskState},
};
use crate::events::{Bus, Event, EventKind};

pub(crate) struct Cohort {
    members: Vec<Arc<Member>>,
    bus: Bus,
    bridge_exit: OnceLock<Instant>,
}

impl Cohort {
    pub(crate) fn new(members: Vec<Arc<Member>>, bus: Bus) -> Self {
        Self {
            members,
            bus,
            bridge_exit: OnceLock::new(),
        }
    }

    pub(crate) fn members(&self) -> &[Arc<Member>] {
        &self.members
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&Arc<Member>> {
        self.members.get(id.index())
    }

    /// Issues one cancellation request and publishes `CancelRequested` for it.
    ///
    /// Returns `false` for unknown ids, terminal members and repeated requests.
    pub(crate) fn cancel(&self, id: TaskId) -> bool {
        let Some(member) = self.get(id) else {
            return false;
        };
        if !member.request_cancel() {
            return false;
        }
        debug!(task = %member.name, "cancel requested");
        self.bus
            .publish(Event::new(EventKind::CancelRequested).with_task(member.name.clone()));
        true
    }

    /// Records the run loop's exit and cancels every sibling. Runs at most once.
    pub(crate) fn bridge_exited(&self, bridge: &Member, state: TaskState) {
        if self.bridge_exit.set(Instant::now()).is_err() {
            return;
        }
        info!(task = %bridge.name, state = state.as_label(), "run loop exited");
        self.bus.publish(
            Event::new(EventKind::RunLoopExited)
                .with_task(bridge.name.clone())
                .with_reason(state.as_label()),
        );
        for member in &self.members {
            if member.id != bridge.id {
                self.cancel(member.id);
            }
        }
    }

    /// Instant after which siblings still running get aborted.
    ///
    /// `None` until the run loop has exited, or when `grace` is unlimited.
    pub(crate) fn grace_deadline(&self, grace: Option<Duration>) -> Option<Instant> {
        let exited = *self.bridge_exit.get()?;
        grace.map(|g| exited + g)
    }
}
