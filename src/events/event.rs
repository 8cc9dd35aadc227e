//! # Lifecycle events emitted by the supervisor and its members.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Member events**: per-task flow (starting, completed, cancelled, failed, cancel requested)
//! - **Group events**: cohort flow (spawned, run loop exited, grace exceeded, done)
//! - **Subscriber events**: delivery problems inside the subscriber set
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use loopvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("watcher")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("watcher"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `task` (subscriber name) and `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `task` (subscriber name) and `reason` ("full" or "closed").
    SubscriberOverflow,

    // === Group events ===
    /// All members were spawned.
    ///
    /// Sets `reason` (member count).
    GroupSpawned,

    /// The bridge task reached a terminal state; siblings are being cancelled.
    ///
    /// Sets `task` (bridge name) and `reason` (terminal state).
    RunLoopExited,

    /// Members outlived the grace period after the run loop exited and were aborted.
    ///
    /// Sets `reason` (stuck member names).
    GraceExceeded,

    /// Every member is terminal.
    GroupDone,

    // === Member events ===
    /// Member is about to run its body.
    ///
    /// Sets `task`.
    TaskStarting,

    /// Member finished its body normally.
    ///
    /// Sets `task`.
    TaskCompleted,

    /// Member unwound after a cancellation request.
    ///
    /// Sets `task`.
    TaskCancelled,

    /// Member failed with a non-cancellation error.
    ///
    /// Sets `task` and `reason` (error message).
    TaskFailed,

    /// The supervisor flipped a member's cancellation token.
    ///
    /// Sets `task`.
    CancelRequested,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, terminal states, counts).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events describing one member's terminal outcome.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskCompleted | EventKind::TaskCancelled | EventKind::TaskFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(Event::new(EventKind::TaskCancelled).is_terminal());
        assert!(!Event::new(EventKind::CancelRequested).is_terminal());
        assert!(!Event::new(EventKind::GroupDone).is_terminal());
    }
}
