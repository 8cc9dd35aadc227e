//! # Run one member to a terminal state.
//!
//! ## Event flow
//!
//! ```text
//! Success:       spawn() → Ok(())                → TaskCompleted
//! Cancellation:  spawn() → Err(Canceled)         → TaskCancelled
//! Failure:       spawn() → Err(other)            → TaskFailed
//! Panic:         spawn() panics                  → TaskFailed (Fatal)
//!
//! Bridge member, any outcome: terminal event → Cohort::bridge_exited
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per member
//! - Panics are caught at this boundary and never unwind into the join set
//! - A member whose token fired before it started does not run its body
//! - The body's own result decides the outcome: `Ok(())` is Completed even if
//!   cancellation was requested while it was finishing

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::{
    core::cohort::Cohort,
    core::member::Member,
    core::state::{TaskId, TaskState},
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::{Role, TaskRef},
};

/// Terminal outcome of one member.
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed,
    Cancelled,
    Failed(TaskError),
}

impl Outcome {
    pub(crate) fn state(&self) -> TaskState {
        match self {
            Outcome::Completed => TaskState::Completed,
            Outcome::Cancelled => TaskState::Cancelled,
            Outcome::Failed(_) => TaskState::Failed,
        }
    }
}

/// Runs `task` as `member` and records the outcome on the member.
pub(crate) async fn run_member(task: TaskRef, member: Arc<Member>, bus: Bus) -> (TaskId, Outcome) {
    member.state.advance(TaskState::Running);
    bus.publish(Event::new(EventKind::TaskStarting).with_task(member.name.clone()));

    let outcome = if member.token.is_cancelled() {
        debug!(task = %member.name, "cancelled before start");
        Outcome::Cancelled
    } else {
        let fut = task.spawn(member.token.clone());
        match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => Outcome::Completed,
            Ok(Err(TaskError::Canceled)) => Outcome::Cancelled,
            Ok(Err(e)) => Outcome::Failed(e),
            Err(panic) => Outcome::Failed(TaskError::Fatal {
                error: format!("panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    };

    finish(&member, &outcome, &bus);
    (member.id, outcome)
}

/// Runs one member of `cohort`; a bridge member cancels its siblings on exit.
pub(crate) async fn run_in_cohort(
    task: TaskRef,
    member: Arc<Member>,
    cohort: Arc<Cohort>,
    bus: Bus,
) -> (TaskId, Outcome) {
    let (id, outcome) = run_member(task, Arc::clone(&member), bus).await;
    if member.role == Role::Bridge {
        cohort.bridge_exited(&member, outcome.state());
    }
    (id, outcome)
}

/// Moves the member to its terminal state and publishes the terminal event.
pub(crate) fn finish(member: &Member, outcome: &Outcome, bus: &Bus) {
    member.state.advance(outcome.state());
    let ev = match outcome {
        Outcome::Completed => {
            info!(task = %member.name, "completed");
            Event::new(EventKind::TaskCompleted)
        }
        Outcome::Cancelled => {
            info!(task = %member.name, "cancelled");
            Event::new(EventKind::TaskCancelled)
        }
        Outcome::Failed(e) => {
            warn!(task = %member.name, error = %e, label = e.as_label(), "failed");
            member.record_error(e.to_string());
            Event::new(EventKind::TaskFailed).with_reason(e.to_string())
        }
    };
    bus.publish(ev.with_task(member.name.clone()));
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Role, TaskFn};
    use tokio_util::sync::CancellationToken;

    fn member(name: &str) -> Arc<Member> {
        Arc::new(Member::new(
            TaskId(0),
            name,
            Role::Member,
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_outcomes_map_to_states() {
        let bus = Bus::new(16);

        let ok: TaskRef = TaskFn::arc("ok", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        });
        let m = member("ok");
        let (_, out) = run_member(ok, m.clone(), bus.clone()).await;
        assert!(matches!(out, Outcome::Completed));
        assert_eq!(m.state.get(), TaskState::Completed);

        let bad: TaskRef = TaskFn::arc("bad", |_ctx: CancellationToken| async {
            Err::<(), _>(TaskError::Fail {
                error: "nope".into(),
            })
        });
        let m = member("bad");
        let (_, out) = run_member(bad, m.clone(), bus.clone()).await;
        assert!(matches!(out, Outcome::Failed(TaskError::Fail { .. })));
        assert_eq!(m.report().error.as_deref(), Some("execution failed: nope"));
    }

    #[tokio::test]
    async fn test_own_result_wins_over_cancel_request() {
        let swallow: TaskRef = TaskFn::arc("swallow", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<(), TaskError>(())
        });
        let m = member("swallow");
        let runner = tokio::spawn(run_member(swallow, m.clone(), Bus::new(4)));
        tokio::task::yield_now().await;
        m.request_cancel();

        let (_, out) = runner.await.unwrap();
        assert!(matches!(out, Outcome::Completed));
        assert_eq!(m.state.get(), TaskState::Completed);
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let boom: TaskRef = TaskFn::arc("boom", |_ctx: CancellationToken| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), TaskError>(())
        });
        let m = member("boom");
        let (_, out) = run_member(boom, m.clone(), Bus::new(4)).await;
        match out {
            Outcome::Failed(TaskError::Fatal { error }) => assert!(error.contains("kaboom")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bridge_exit_cancels_siblings_from_its_own_runner() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let group = CancellationToken::new();
        let bridge = Arc::new(Member::new(TaskId(0), "app", Role::Bridge, group.child_token()));
        let sibling = Arc::new(Member::new(TaskId(1), "idle", Role::Member, group.child_token()));
        let cohort = Arc::new(Cohort::new(
            vec![bridge.clone(), sibling.clone()],
            bus.clone(),
        ));

        let app: TaskRef = TaskFn::arc("app", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        });
        let (_, out) = run_in_cohort(app, bridge.clone(), cohort.clone(), bus.clone()).await;
        assert!(matches!(out, Outcome::Completed));

        // Nobody joined the runner; the sibling's token already fired.
        assert!(sibling.token.is_cancelled());
        assert!(!bridge.token.is_cancelled());
        assert!(cohort.grace_deadline(Some(std::time::Duration::from_secs(1))).is_some());
        assert!(cohort.grace_deadline(None).is_none());

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push((ev.kind, ev.task.map(|t| t.to_string())));
        }
        assert!(kinds.contains(&(EventKind::RunLoopExited, Some("app".to_string()))));
        assert!(kinds.contains(&(EventKind::CancelRequested, Some("idle".to_string()))));
        assert!(!kinds.contains(&(EventKind::CancelRequested, Some("app".to_string()))));
    }
}
