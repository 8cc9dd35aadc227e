//! # Process entry: scheduler + supervisor + exit code.
//!
//! ```text
//! run_to_exit(cfg, subscribers, make_specs)
//!   ├─► cfg.build_runtime()          (CurrentThread | MultiThread)
//!   └─► block_on:
//!         ├─► Supervisor::builder(cfg).with_subscribers(..).build()
//!         ├─► tokio::spawn(sup.run(make_specs()))
//!         └─► join:
//!               Ok(Ok(report))     → log per-member outcome, exit 0
//!               Ok(Err(error))     → log error, exit 1
//!               Err(cancelled)     → "all done", exit 0
//!               Err(panic)         → log panic, exit 1
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{error, info};

use super::{config::Config, member::GroupReport, supervisor::Supervisor};
use crate::{error::RuntimeError, subscribers::Subscribe, tasks::TaskSpec};

/// How the process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    Graceful,
    Failed,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Graceful => ExitCode::SUCCESS,
            Exit::Failed => ExitCode::FAILURE,
        }
    }
}

/// Starts the scheduler selected by `cfg`, runs one group to completion and
/// returns the process exit code.
///
/// `make_specs` runs inside the scheduler, so specs may capture runtime handles.
///
/// ### Errors
/// [`RuntimeError::Scheduler`] if the runtime cannot be built. Every other
/// outcome is folded into the returned [`ExitCode`].
pub fn run_to_exit<F>(
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    make_specs: F,
) -> Result<ExitCode, RuntimeError>
where
    F: FnOnce() -> Vec<TaskSpec> + Send + 'static,
{
    let runtime = cfg.build_runtime()?;
    let exit = runtime.block_on(async move {
        let sup = Supervisor::builder(cfg)
            .with_subscribers(subscribers)
            .build();
        let group = tokio::spawn(async move { sup.run(make_specs()).await });
        classify(group.await)
    });
    Ok(exit.into())
}

/// Maps the joined top-level group future to an [`Exit`].
pub(crate) fn classify(joined: Result<Result<GroupReport, RuntimeError>, JoinError>) -> Exit {
    match joined {
        Ok(Ok(report)) => {
            for m in &report.members {
                info!(task = %m.name, state = m.state.as_label(), "done with member");
            }
            Exit::Graceful
        }
        Ok(Err(err)) => {
            error!(error = %err, label = err.as_label(), "group ended with an error");
            Exit::Failed
        }
        Err(join) if join.is_cancelled() => {
            info!("all done");
            Exit::Graceful
        }
        Err(join) => {
            error!(error = %join, "group panicked");
            Exit::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_top_level_cancellation_is_graceful() {
        let handle = tokio::spawn(async {
            std::future::pending::<Result<GroupReport, RuntimeError>>().await
        });
        handle.abort();
        assert_eq!(classify(handle.await), Exit::Graceful);
    }

    #[test]
    fn test_errors_fail_the_process() {
        assert_eq!(classify(Ok(Ok(GroupReport::default()))), Exit::Graceful);
        assert_eq!(classify(Ok(Err(RuntimeError::NotSpawned))), Exit::Failed);
    }
}
