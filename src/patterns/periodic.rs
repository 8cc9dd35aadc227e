//! # Periodic: act, sleep, repeat until cancelled.
//!
//! ```text
//! first poll ─► arm OnExit(cleanup)
//!   loop:
//!     on_tick(n)
//!     select! (biased)
//!       ├─ ctx.cancelled() ─► Err(Canceled)   (guard runs cleanup)
//!       └─ sleep(every)    ─► next iteration
//! ```
//!
//! Cleanup runs exactly once on every exit path, including panics in the tick
//! action and the future being dropped. A future dropped before its first poll
//! never armed the guard and runs nothing.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::OnExit;
use crate::error::TaskError;
use crate::tasks::{BoxTaskFuture, Task};

type TickFn = Arc<dyn Fn(u64) + Send + Sync + 'static>;
type CleanupFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Background member that repeats an action at a fixed interval.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use loopvisor::{TaskSpec, patterns::Periodic};
///
/// let beach = Periodic::new("beach", Duration::from_secs(2))
///     .on_tick(|n| println!("tick {n}"))
///     .on_cleanup(|| println!("cleaned up"));
/// let spec = TaskSpec::member(beach.into_ref());
/// assert_eq!(spec.name(), "beach");
/// ```
pub struct Periodic {
    name: Cow<'static, str>,
    every: Duration,
    tick: Option<TickFn>,
    cleanup: Option<CleanupFn>,
}

impl Periodic {
    pub fn new(name: impl Into<Cow<'static, str>>, every: Duration) -> Self {
        Self {
            name: name.into(),
            every,
            tick: None,
            cleanup: None,
        }
    }

    /// Action run at the start of every iteration; receives the iteration number.
    pub fn on_tick(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.tick = Some(Arc::new(f));
        self
    }

    /// Cleanup run once when the task stops, however it stops.
    pub fn on_cleanup(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cleanup = Some(Arc::new(f));
        self
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    /// Wraps into a shareable task handle.
    pub fn into_ref(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Task for Periodic {
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        let name = self.name.clone();
        let every = self.every;
        let tick = self.tick.clone();
        let cleanup = self.cleanup.clone();

        Box::pin(async move {
            let _guard = {
                let name = name.clone();
                OnExit::new(move || {
                    if let Some(cleanup) = cleanup {
                        cleanup();
                    }
                    info!(task = %name, "done wasting time");
                })
            };

            let mut n = 0u64;
            loop {
                info!(task = %name, iteration = n, "sitting on the beach");
                if let Some(tick) = &tick {
                    tick(n);
                }
                n += 1;

                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Err(TaskError::Canceled),
                    _ = tokio::time::sleep(every) => {}
                }
            }
        })
    }
}
