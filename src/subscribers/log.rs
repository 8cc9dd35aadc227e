//! # LogWriter: lifecycle events rendered through `tracing`
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO loopvisor: task starting task="watcher"
//! INFO loopvisor: run loop exited, cancelling siblings task="app" state="completed"
//! INFO loopvisor: task cancelled task="beach"
//! INFO loopvisor: all members terminal
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards every lifecycle event to `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::GroupSpawned => info!(target: "loopvisor", members = reason, "group spawned"),
            EventKind::TaskStarting => debug!(target: "loopvisor", task, "task starting"),
            EventKind::TaskCompleted => info!(target: "loopvisor", task, "task completed"),
            EventKind::TaskCancelled => info!(target: "loopvisor", task, "task cancelled"),
            EventKind::TaskFailed => warn!(target: "loopvisor", task, error = reason, "task failed"),
            EventKind::CancelRequested => debug!(target: "loopvisor", task, "cancel requested"),
            EventKind::RunLoopExited => info!(
                target: "loopvisor",
                task,
                state = reason,
                "run loop exited, cancelling siblings"
            ),
            EventKind::GraceExceeded => warn!(target: "loopvisor", stuck = reason, "grace exceeded"),
            EventKind::GroupDone => info!(target: "loopvisor", "all members terminal"),
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(target: "loopvisor", subscriber = task, reason, "subscriber problem")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
