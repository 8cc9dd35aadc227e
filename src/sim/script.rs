use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::SimEngine;
use crate::bridge::{ForeignLoop, ForeignLoopError};

/// Event fired by [`Step::Release`].
pub const ON_RELEASE: &str = "on_release";

/// One instruction of a scripted run loop.
#[derive(Clone, Debug)]
pub enum Step {
    /// Block until `widget` has `count` callbacks for `event`; fail after `within`.
    AwaitSubscribers {
        widget: String,
        event: String,
        count: usize,
        within: Duration,
    },
    /// Simulate a user releasing a button.
    Release(String),
    Dispatch {
        widget: String,
        event: String,
    },
    /// Block the loop thread.
    Pause(Duration),
    Destroy(String),
    /// Stop the loop with an engine error.
    Fail(String),
}

/// Scripted [`ForeignLoop`] driving a [`SimEngine`].
///
/// Runs its steps in order, then returns as if the window was closed.
pub struct SimLoop {
    engine: Arc<SimEngine>,
    steps: Vec<Step>,
}

impl SimLoop {
    pub fn new(engine: Arc<SimEngine>) -> Self {
        Self {
            engine,
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Waits for one `on_release` listener on `widget`.
    pub fn await_listener(self, widget: &str, within: Duration) -> Self {
        self.then(Step::AwaitSubscribers {
            widget: widget.to_string(),
            event: ON_RELEASE.to_string(),
            count: 1,
            within,
        })
    }

    /// Appends `n` releases of `widget`.
    pub fn releases(mut self, widget: &str, n: usize) -> Self {
        self.steps
            .extend(std::iter::repeat_n(Step::Release(widget.to_string()), n));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl ForeignLoop for SimLoop {
    fn run(self: Box<Self>) -> Result<(), ForeignLoopError> {
        let SimLoop { engine, steps } = *self;
        for (i, step) in steps.into_iter().enumerate() {
            debug!(step = i, ?step, "sim step");
            match step {
                Step::AwaitSubscribers {
                    widget,
                    event,
                    count,
                    within,
                } => engine.await_subscribers(&widget, &event, count, within)?,
                Step::Release(widget) => {
                    engine.dispatch(&widget, ON_RELEASE);
                }
                Step::Dispatch { widget, event } => {
                    engine.dispatch(&widget, &event);
                }
                Step::Pause(d) => std::thread::sleep(d),
                Step::Destroy(widget) => engine.destroy(&widget),
                Step::Fail(reason) => return Err(ForeignLoopError::Engine(reason)),
            }
        }
        info!("window closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_steps_in_order() {
        let engine = SimEngine::new();
        engine.widget("btn", &[ON_RELEASE]);
        let script = SimLoop::new(engine.clone())
            .releases("btn", 2)
            .then(Step::Destroy("btn".into()));
        assert_eq!(script.steps().len(), 3);

        Box::new(script).run().unwrap();
        assert!(engine.is_destroyed("btn"));
    }

    #[test]
    fn test_fail_stops_the_loop() {
        let engine = SimEngine::new();
        engine.widget("btn", &[ON_RELEASE]);
        let script = SimLoop::new(engine.clone())
            .then(Step::Fail("gpu lost".into()))
            .then(Step::Destroy("btn".into()));

        let err = Box::new(script).run().unwrap_err();
        assert_eq!(err.to_string(), "engine error: gpu lost");
        assert!(!engine.is_destroyed("btn"));
    }

    #[test]
    fn test_missing_listener_times_out() {
        let engine = SimEngine::new();
        engine.widget("btn", &[ON_RELEASE]);
        let script = SimLoop::new(engine).await_listener("btn", Duration::from_millis(5));
        let err = Box::new(script).run().unwrap_err();
        assert!(matches!(err, ForeignLoopError::TimedOut(_)));
    }
}
