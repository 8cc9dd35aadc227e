//! Demo: a simulated window with a button and a label, supervised next to a
//! watcher that mirrors button releases and a periodic background task.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use loopvisor::sim::{ON_RELEASE, SimEngine, SimLoop, Step};
use loopvisor::{
    Config, LogWriter, Periodic, PressWatcher, Scheduler, Subscribe, TaskSpec, run_to_exit,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Flavor {
    CurrentThread,
    MultiThread,
}

#[derive(Parser, Debug)]
#[command(name = "loopvisor")]
#[command(about = "Run a simulated UI loop next to supervised tokio tasks")]
struct Args {
    /// Tokio scheduler driving the group.
    #[arg(long, value_enum, default_value_t = Flavor::CurrentThread)]
    scheduler: Flavor,

    /// Worker threads for the multi-thread scheduler (0 = tokio default).
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Button releases the simulated user performs before closing the window.
    #[arg(long, default_value_t = 3)]
    presses: usize,

    /// Watcher stops after `limit + 1` label updates.
    #[arg(long, default_value_t = 7)]
    limit: u64,

    /// Interval of the background task, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    tick_ms: u64,

    /// Delay between simulated releases, in milliseconds.
    #[arg(long, default_value_t = 500)]
    gap_ms: u64,

    /// Seconds to wait for tasks after the window closed (0 = forever).
    #[arg(long, default_value_t = 60)]
    grace_secs: u64,

    /// Make the run loop fail with this message instead of closing normally.
    #[arg(long)]
    fail: Option<String>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

fn config(args: &Args) -> Config {
    Config {
        scheduler: match args.scheduler {
            Flavor::CurrentThread => Scheduler::CurrentThread,
            Flavor::MultiThread => Scheduler::MultiThread {
                workers: args.workers,
            },
        },
        grace: Duration::from_secs(args.grace_secs),
        ..Config::default()
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing();

    let cfg = config(&args);
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];

    let engine = SimEngine::new();
    let btn = engine.widget("btn", &["on_press", ON_RELEASE]);
    let label = engine.widget("label", &[]);

    let gap = Duration::from_millis(args.gap_ms);
    let mut script = SimLoop::new(Arc::clone(&engine)).await_listener("btn", Duration::from_secs(5));
    for _ in 0..args.presses {
        script = script
            .then(Step::Pause(gap))
            .then(Step::Dispatch {
                widget: "btn".into(),
                event: "on_press".into(),
            })
            .then(Step::Release("btn".into()));
    }
    script = script.then(Step::Pause(gap));
    if let Some(reason) = args.fail.clone() {
        script = script.then(Step::Fail(reason));
    }

    let watcher = PressWatcher::new("watch_button_closely", btn, ON_RELEASE, label, args.limit);
    let beach = Periodic::new("waste_time_freely", Duration::from_millis(args.tick_ms));

    let code = run_to_exit(cfg, subscribers, move || {
        vec![
            TaskSpec::bridge("run_app_happily", script),
            TaskSpec::member(watcher.into_ref()),
            TaskSpec::member(beach.into_ref()),
        ]
    })
    .context("failed to start the scheduler")?;

    if let Some(text) = engine.text("label") {
        tracing::info!(label = %text, "final label");
    }
    Ok(code)
}
