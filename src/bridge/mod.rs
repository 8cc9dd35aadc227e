//! # Loop bridge: a blocking foreign run loop as one group member.
//!
//! An external engine exposes a single blocking entry point that returns when
//! the engine decides to stop (typically the window was closed). [`BridgeTask`]
//! moves that call onto tokio's blocking pool, so the member suspends while the
//! engine runs and every other member keeps making progress.
//!
//! ```text
//! Supervisor ──► runner ──► BridgeTask::spawn()
//!                              └─► spawn_blocking(ForeignLoop::run)
//!                                        │  (engine dispatches callbacks)
//!                                        ▼
//!                              Ok / ForeignLoopError / panic
//!                                        │
//!                  Supervisor observes terminal state ──► cancel every sibling
//! ```
//!
//! The blocking call cannot be interrupted: the bridge ignores its own
//! cancellation token and only finishes when the engine returns.

use std::sync::Mutex;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::TaskError;
use crate::tasks::{BoxTaskFuture, Task};

/// Error raised by a foreign engine's run loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ForeignLoopError {
    /// Engine-specific failure.
    #[error("engine error: {0}")]
    Engine(String),

    /// The engine gave up waiting for a precondition.
    #[error("engine timed out: {0}")]
    TimedOut(String),

    /// Any other error type produced by the engine binding.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Contract of the external run loop.
///
/// [`run`](ForeignLoop::run) blocks the calling thread until the engine stops.
/// It is called at most once.
pub trait ForeignLoop: Send + 'static {
    /// Runs the engine until it decides to exit.
    fn run(self: Box<Self>) -> Result<(), ForeignLoopError>;
}

impl<F> ForeignLoop for F
where
    F: FnOnce() -> Result<(), ForeignLoopError> + Send + 'static,
{
    fn run(self: Box<Self>) -> Result<(), ForeignLoopError> {
        (*self)()
    }
}

/// Member task that drives a [`ForeignLoop`].
///
/// The loop is consumed by the first spawn; a second spawn fails with
/// [`TaskError::Fatal`].
pub struct BridgeTask {
    name: String,
    run_loop: Mutex<Option<Box<dyn ForeignLoop>>>,
}

impl BridgeTask {
    /// Wraps `run_loop` into a member named `name`.
    pub fn new(name: impl Into<String>, run_loop: impl ForeignLoop) -> Self {
        Self {
            name: name.into(),
            run_loop: Mutex::new(Some(Box::new(run_loop))),
        }
    }

    fn take_loop(&self) -> Option<Box<dyn ForeignLoop>> {
        match self.run_loop.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Task for BridgeTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, _ctx: CancellationToken) -> BoxTaskFuture {
        let name = self.name.clone();
        let run_loop = self.take_loop();

        Box::pin(async move {
            let Some(run_loop) = run_loop else {
                return Err(TaskError::Fatal {
                    error: format!("run loop of '{name}' was already consumed"),
                });
            };

            debug!(task = %name, "entering foreign run loop");
            let res = tokio::task::spawn_blocking(move || run_loop.run()).await;
            info!(task = %name, "app done");

            match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(TaskError::ForeignLoop {
                    error: e.to_string(),
                }),
                Err(join) if join.is_panic() => Err(TaskError::ForeignLoop {
                    error: format!(
                        "run loop panicked: {}",
                        crate::core::panic_message(join.into_panic().as_ref())
                    ),
                }),
                Err(join) => Err(TaskError::ForeignLoop {
                    error: join.to_string(),
                }),
            }
        })
    }
}
