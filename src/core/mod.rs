//! Runtime core: group orchestration and lifecycle.
//!
//! Internal modules:
//! - [`runner`]: runs one member to a terminal state and publishes its events;
//! - [`supervisor`]: spawns the cohort, applies the bridge-exit policy, drains;
//! - [`cohort`]: member list shared with the runners, bridge-exit cancellation;
//! - [`member`]: per-member bookkeeping and reports;
//! - [`state`]: forward-only task and phase state machines;
//! - [`config`]: scheduler, bus and grace settings;
//! - [`entry`]: process entry point mapping the group result to an exit code.

mod builder;
mod cohort;
mod config;
mod entry;
mod member;
mod runner;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{Config, Scheduler};
pub use entry::{Exit, run_to_exit};
pub use member::{GroupReport, MemberReport};
pub(crate) use runner::panic_message;
pub use state::{Phase, TaskId, TaskState};
pub use supervisor::Supervisor;
