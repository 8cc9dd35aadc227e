//! # loopvisor
//!
//! **Loopvisor** runs an external engine's blocking, callback-driven run loop
//! as one member of a supervised group of tokio tasks.
//!
//! Callbacks become a lazy async sequence, the run loop becomes a task, and
//! when the run loop exits every other member of the group is cancelled.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ TaskSpec     │   │ TaskSpec     │   │ TaskSpec     │
//!     │ (bridge)     │   │ (watcher)    │   │ (periodic)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - group CancellationToken (one child per member)                 │
//! │  - JoinSet of runners (fixed membership)                          │
//! │  - Bus (broadcast lifecycle events) ──► SubscriberSet             │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   BridgeTask          PressWatcher        Periodic
//!   spawn_blocking(     EventStream ◄──┐    tick, sleep,
//!     ForeignLoop::run) │              │    OnExit cleanup
//!        │              │ callbacks    │
//!        ▼              ▼              │
//!   ┌──────────────────────────────────┴─┐
//!   │  external engine (EventSource)     │
//!   └────────────────────────────────────┘
//! ```
//!
//! ### Shutdown
//! ```text
//! ForeignLoop::run returns (Ok, Err or panic)
//!   └─► bridge member terminal
//!         └─► Supervisor: RunLoopExited, cancel(id) for every sibling (once)
//!               └─► siblings observe ctx at their next await point
//!                     └─► all terminal ─► GroupDone ─► wait_all returns
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Sources**       | Callback registration turned into an async sequence.      | [`EventSource`], [`EventStream`]            |
//! | **Bridge**        | Blocking foreign run loop as a group member.              | [`ForeignLoop`], [`BridgeTask`]             |
//! | **Supervision**   | Fixed cohort, wait for all, cancel by id.                 | [`Supervisor`], [`TaskId`], [`Phase`]       |
//! | **Patterns**      | Periodic background work, event watchers, drop guards.    | [`Periodic`], [`PressWatcher`], [`OnExit`]  |
//! | **Subscriber API**| Hook into lifecycle events.                               | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors for the group and its members.               | [`TaskError`], [`RuntimeError`]             |
//! | **Configuration** | Scheduler, bus capacity, grace period.                    | [`Config`], [`Scheduler`]                   |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use loopvisor::{Config, Supervisor, TaskError, TaskFn, TaskSpec, TaskState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(Config::default()).build();
//!
//!     let idle = TaskFn::arc("idle", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Err::<(), _>(TaskError::Canceled)
//!     });
//!     let run_loop = || {
//!         std::thread::sleep(Duration::from_millis(10));
//!         Ok::<(), loopvisor::ForeignLoopError>(())
//!     };
//!
//!     let report = sup
//!         .run(vec![TaskSpec::bridge("app", run_loop), TaskSpec::member(idle)])
//!         .await?;
//!     assert_eq!(report.state("idle"), Some(TaskState::Cancelled));
//!     Ok(())
//! }
//! ```

pub mod bridge;
mod core;
mod error;
mod events;
pub mod patterns;
pub mod sim;
pub mod source;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{
    Config, Exit, GroupReport, MemberReport, Phase, Scheduler, Supervisor, SupervisorBuilder,
    TaskId, TaskState, run_to_exit,
};
pub use bridge::{BridgeTask, ForeignLoop, ForeignLoopError};
pub use error::{RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use patterns::{OnExit, Periodic, PressWatcher, TextSink};
pub use source::{Callback, EventSource, EventStream, SourceError};
pub use subscribers::{LogWriter, Subscribe};
pub use tasks::{BoxTaskFuture, Role, Task, TaskFn, TaskRef, TaskSpec};
