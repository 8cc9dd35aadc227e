//! # Supervisor: one cohort of members, one run loop, one shutdown signal.
//!
//! The [`Supervisor`] owns the lifecycle event bus, the subscriber listener, the
//! group cancellation token and the fixed cohort of members spawned from
//! [`TaskSpec`]s.
//!
//! ## Key responsibilities
//! - spawn one member per spec into a `JoinSet` (membership is fixed afterwards)
//! - wait until **every** member is terminal
//! - when the bridge member exits (any outcome), cancel every sibling exactly once
//! - surface run-loop and member failures to the caller of [`Supervisor::wait_all`]
//!
//! ## Architecture
//! ```text
//! spawn(specs):
//!   TaskSpec[0] (bridge)   TaskSpec[1]   ...   TaskSpec[N-1]
//!        │                     │                     │
//!        └──► Member { id, token = group_token.child_token(), state }
//!                 set.spawn(run_in_cohort(task, member, cohort, bus))
//!
//! bridge runner, right after its terminal event:
//!   publish RunLoopExited ─► cancel(id) for every other member
//!                         ─► grace deadline = exit instant + cfg.grace
//!
//! wait_all():
//!   loop join_next()
//!     ├─ member Failed    ─► remember first error (no cancellation)
//!     └─ set empty        ─► Phase::Done, publish GroupDone
//!                         ─► stop listener, shut subscriber workers down
//!
//! Grace deadline hit:
//!   abort_all() ─► stragglers recorded Cancelled ─► GraceExceeded
//! ```
//!
//! ## Rules
//! - Only the bridge member's exit cancels others; failures of other members never do.
//! - `cancel` is idempotent and a no-op for terminal members.
//! - Phase only moves forward: Spawning → Running → Draining → Done.

use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{
    builder::SupervisorBuilder,
    config::Config,
    member::{GroupReport, Member},
    cohort::Cohort,
    runner::{Outcome, finish, run_in_cohort},
    state::{Phase, PhaseCell, TaskId, TaskState},
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    tasks::{Role, TaskSpec},
};

type Joins = JoinSet<(TaskId, Outcome)>;

/// Coordinates one group of members and its shutdown.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subscribers: usize,
    group_token: CancellationToken,
    listener_stop: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    cohort: OnceLock<Arc<Cohort>>,
    joins: Mutex<Option<Joins>>,
    phase: PhaseCell,
}

impl Supervisor {
    /// Returns a builder for configuring a supervisor.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: Config, bus: Bus, subscribers: usize) -> Self {
        let group_token = CancellationToken::new();
        Self {
            cfg,
            bus,
            subscribers,
            listener_stop: group_token.child_token(),
            group_token,
            listener: Mutex::new(None),
            cohort: OnceLock::new(),
            joins: Mutex::new(None),
            phase: PhaseCell::new(),
        }
    }

    /// Spawns the members and waits for all of them.
    pub async fn run(&self, specs: Vec<TaskSpec>) -> Result<GroupReport, RuntimeError> {
        self.spawn(specs)?;
        self.wait_all().await
    }

    /// Spawns one member per spec, concurrently, and returns their ids in spec order.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// ### Errors
    /// - [`RuntimeError::DuplicateBridge`] if more than one spec has [`Role::Bridge`]
    /// - [`RuntimeError::DuplicateTask`] if two specs share a name
    /// - [`RuntimeError::AlreadySpawned`] if this group was spawned before
    pub fn spawn(&self, specs: Vec<TaskSpec>) -> Result<Vec<TaskId>, RuntimeError> {
        validate(&specs)?;

        let mut joins = lock(&self.joins);
        let members: Vec<Arc<Member>> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                Arc::new(Member::new(
                    TaskId(i),
                    spec.name(),
                    spec.role(),
                    self.group_token.child_token(),
                ))
            })
            .collect();
        let cohort = Arc::new(Cohort::new(members.clone(), self.bus.clone()));
        self.cohort
            .set(Arc::clone(&cohort))
            .map_err(|_| RuntimeError::AlreadySpawned)?;

        let mut set = JoinSet::new();
        for (spec, member) in specs.into_iter().zip(&members) {
            set.spawn(run_in_cohort(
                spec.task().clone(),
                Arc::clone(member),
                Arc::clone(&cohort),
                self.bus.clone(),
            ));
        }
        *joins = Some(set);

        self.phase.raise(Phase::Running);
        self.bus
            .publish(Event::new(EventKind::GroupSpawned).with_reason(members.len().to_string()));
        debug!(members = members.len(), "group spawned");

        Ok(members.iter().map(|m| m.id).collect())
    }

    /// Suspends until every member is terminal.
    ///
    /// Member cancellation is not an error. The first genuinely unexpected
    /// outcome is returned after the group has fully drained:
    /// - [`RuntimeError::ForeignLoop`] if the bridge member failed
    /// - [`RuntimeError::MemberFailed`] if another member failed
    /// - [`RuntimeError::GraceExceeded`] if siblings outlived the grace period
    ///
    /// The grace period is measured from the run loop's exit, not from this call.
    /// Before returning, lifecycle events are flushed to the subscribers and
    /// their workers are shut down.
    ///
    /// Once the group is [`Phase::Done`], further calls return the final report;
    /// the error, if any, is only returned by the call that drained the group.
    /// Calling it before [`Supervisor::spawn`], or while another call is still
    /// draining, returns [`RuntimeError::NotSpawned`].
    pub async fn wait_all(&self) -> Result<GroupReport, RuntimeError> {
        let Some(mut set) = lock(&self.joins).take() else {
            return match self.phase() {
                Phase::Done => Ok(self.report()),
                _ => Err(RuntimeError::NotSpawned),
            };
        };
        let mut first_error: Option<RuntimeError> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            if deadline.is_none() {
                deadline = self
                    .cohort
                    .get()
                    .and_then(|c| c.grace_deadline(self.cfg.grace_limit()));
            }
            let joined = match deadline {
                Some(at) => match time::timeout_at(at, set.join_next()).await {
                    Ok(joined) => joined,
                    Err(_elapsed) => {
                        let stuck = self.abort_stragglers(&mut set).await;
                        if first_error.is_none() {
                            first_error = Some(RuntimeError::GraceExceeded {
                                grace: self.cfg.grace,
                                stuck,
                            });
                        }
                        break;
                    }
                },
                None => set.join_next().await,
            };
            let Some(joined) = joined else { break };

            match joined {
                Ok((id, outcome)) => {
                    let member = Arc::clone(&self.members()[id.index()]);
                    let err = self.on_member_exit(&member, outcome);
                    if first_error.is_none() {
                        first_error = err;
                    }
                }
                Err(join) => warn!(error = %join, "member join failed"),
            }

            if !set.is_empty() {
                self.phase.raise(Phase::Draining);
            }
        }

        self.phase.raise(Phase::Done);
        self.bus.publish(Event::new(EventKind::GroupDone));
        info!("all done");
        self.flush_subscribers().await;

        match first_error {
            Some(err) => Err(err),
            None => Ok(self.report()),
        }
    }

    /// Requests cooperative cancellation of one member.
    ///
    /// Returns `true` if a request was issued. Unknown ids, terminal members and
    /// repeated requests are no-ops returning `false`.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.cohort.get().is_some_and(|c| c.cancel(id))
    }

    /// Id of the member called `name`.
    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.members()
            .iter()
            .find(|m| &*m.name == name)
            .map(|m| m.id)
    }

    /// Current state of one member.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.members().get(id.index()).map(|m| m.state.get())
    }

    /// Current group phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Snapshot of every member in spawn order.
    pub fn report(&self) -> GroupReport {
        GroupReport {
            members: self.members().iter().map(|m| m.report()).collect(),
        }
    }

    /// Creates a receiver for lifecycle events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Stops when the group is done or the supervisor is dropped. On stop it
    /// forwards what is buffered, then shuts the set down.
    pub(crate) fn subscriber_listener(&self, set: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let stop = self.listener_stop.clone();
        let handle = tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    biased;
                    received = rx.recv() => received,
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                };
                match received {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
            debug!("subscriber listener stopped");
        });
        *lock(&self.listener) = Some(handle);
    }

    /// Stops the listener after it forwarded `GroupDone` and waits for the
    /// subscriber workers, bounded by the grace period.
    async fn flush_subscribers(&self) {
        self.listener_stop.cancel();
        let Some(handle) = lock(&self.listener).take() else {
            return;
        };
        match self.cfg.grace_limit() {
            Some(grace) => {
                if time::timeout(grace, handle).await.is_err() {
                    warn!(grace = ?self.cfg.grace, "subscribers did not finish in time");
                }
            }
            None => {
                let _ = handle.await;
            }
        }
    }

    fn members(&self) -> &[Arc<Member>] {
        self.cohort.get().map(|c| c.members()).unwrap_or(&[])
    }

    /// Maps a terminal outcome to the error `wait_all` reports, if any.
    ///
    /// Sibling cancellation already happened in the bridge's own runner.
    fn on_member_exit(&self, member: &Member, outcome: Outcome) -> Option<RuntimeError> {
        match outcome {
            Outcome::Failed(error) => {
                let task = member.name.to_string();
                Some(match member.role {
                    Role::Bridge => RuntimeError::ForeignLoop { task, error },
                    Role::Member => RuntimeError::MemberFailed { task, error },
                })
            }
            Outcome::Completed | Outcome::Cancelled => None,
        }
    }

    /// Aborts every member still in the set; returns the names recorded as cancelled.
    async fn abort_stragglers(&self, set: &mut Joins) -> Vec<String> {
        set.abort_all();
        while let Some(joined) = set.join_next().await {
            if let Ok((id, outcome)) = joined {
                let member = Arc::clone(&self.members()[id.index()]);
                // Failures racing the abort are superseded by GraceExceeded.
                let _ = self.on_member_exit(&member, outcome);
            }
        }

        let mut stuck = Vec::new();
        for member in self.members() {
            if !member.state.get().is_terminal() {
                finish(member, &Outcome::Cancelled, &self.bus);
                stuck.push(member.name.to_string());
            }
        }
        warn!(?stuck, grace = ?self.cfg.grace, "grace exceeded, members aborted");
        self.bus
            .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")));
        stuck
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.group_token.cancel();
    }
}

fn validate(specs: &[TaskSpec]) -> Result<(), RuntimeError> {
    let bridges = specs.iter().filter(|s| s.role() == Role::Bridge).count();
    if bridges > 1 {
        return Err(RuntimeError::DuplicateBridge { count: bridges });
    }
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|s| s.name() == spec.name()) {
            return Err(RuntimeError::DuplicateTask {
                name: spec.name().to_string(),
            });
        }
    }
    Ok(())
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
