//! # Runtime configuration.
//!
//! Provides [`Config`], the settings for one group and the process that hosts it.
//! The scheduler backend is an explicit value here and is consulted once, by
//! [`run_to_exit`](crate::run_to_exit), before the runtime starts.
//!
//! ## Sentinel values
//! - `grace = 0s` → wait for siblings indefinitely after the run loop exits
//! - `Scheduler::MultiThread { workers: 0 }` → tokio's default worker count

use std::time::Duration;

/// Which tokio scheduler drives the process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scheduler {
    /// Single-threaded cooperative scheduler (default).
    #[default]
    CurrentThread,
    /// Work-stealing scheduler with `workers` threads (`0` = tokio default).
    MultiThread { workers: usize },
}

/// Configuration for the supervisor and its hosting runtime.
///
/// ## Field semantics
/// - `scheduler`: runtime flavor built by `run_to_exit`
/// - `bus_capacity`: lifecycle event ring buffer size (min 1)
/// - `grace`: how long to wait for siblings after the bridge exits (`0s` = forever)
#[derive(Clone, Debug)]
pub struct Config {
    /// Scheduler backend.
    pub scheduler: Scheduler,

    /// Capacity of the lifecycle event broadcast channel.
    ///
    /// Slow listeners that lag more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Time the siblings get to unwind once the run loop has exited.
    ///
    /// When it runs out the stragglers are aborted (their drop guards still run),
    /// recorded as cancelled, and `wait_all` returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,
}

impl Config {
    /// Returns the grace period as an `Option` (`None` = unlimited).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Builds the tokio runtime selected by [`Config::scheduler`].
    pub fn build_runtime(&self) -> std::io::Result<tokio::runtime::Runtime> {
        let mut builder = match self.scheduler {
            Scheduler::CurrentThread => tokio::runtime::Builder::new_current_thread(),
            Scheduler::MultiThread { workers } => {
                let mut b = tokio::runtime::Builder::new_multi_thread();
                if workers > 0 {
                    b.worker_threads(workers);
                }
                b
            }
        };
        builder.enable_time().build()
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `scheduler = CurrentThread`
    /// - `bus_capacity = 1024`
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            scheduler: Scheduler::default(),
            bus_capacity: 1024,
            grace: Duration::from_secs(60),
        }
    }
}
