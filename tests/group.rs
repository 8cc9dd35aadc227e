use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use loopvisor::{
    Config, Event, EventKind, ForeignLoopError, Phase, RuntimeError, Subscribe, Supervisor,
    TaskError, TaskFn, TaskRef, TaskSpec, TaskState,
};

fn idle(name: &'static str) -> TaskRef {
    TaskFn::arc(name, |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Err::<(), _>(TaskError::Canceled)
    })
}

fn quick_loop() -> impl FnOnce() -> Result<(), ForeignLoopError> + Send + 'static {
    || {
        std::thread::sleep(Duration::from_millis(20));
        Ok::<(), ForeignLoopError>(())
    }
}

/// Run loop that returns once the test says so.
fn gated_loop() -> (
    mpsc::Sender<()>,
    impl FnOnce() -> Result<(), ForeignLoopError> + Send + 'static,
) {
    let (tx, rx) = mpsc::channel::<()>();
    (tx, move || {
        let _ = rx.recv();
        Ok::<(), ForeignLoopError>(())
    })
}

async fn wait_for(sup: &Supervisor, name: &str, state: TaskState) {
    let id = sup.id_of(name).unwrap();
    while sup.state(id) != Some(state) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn bridge_exit_cancels_every_sibling_once() {
    let sup = Supervisor::builder(Config::default()).build();
    let mut events = sup.subscribe();

    let report = sup
        .run(vec![
            TaskSpec::bridge("app", quick_loop()),
            TaskSpec::member(idle("a")),
            TaskSpec::member(idle("b")),
            TaskSpec::member(idle("c")),
        ])
        .await
        .unwrap();

    assert_eq!(report.state("app"), Some(TaskState::Completed));
    assert_eq!(report.names_in(TaskState::Cancelled), vec!["a", "b", "c"]);
    assert!(report.all_terminal());

    let mut requests: HashMap<String, usize> = HashMap::new();
    let mut loop_exits = 0;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::CancelRequested => {
                *requests.entry(ev.task.unwrap().to_string()).or_default() += 1;
            }
            EventKind::RunLoopExited => loop_exits += 1,
            _ => {}
        }
    }
    assert_eq!(loop_exits, 1);
    assert_eq!(requests.len(), 3);
    assert!(requests.values().all(|&n| n == 1));
    assert!(!requests.contains_key("app"));
}

#[tokio::test]
async fn member_failure_does_not_cancel_the_group() {
    let sup = Supervisor::builder(Config::default()).build();
    let (release, run_loop) = gated_loop();
    let bad = TaskFn::arc("bad", |_ctx: CancellationToken| async {
        Err::<(), _>(TaskError::Fail {
            error: "disk full".into(),
        })
    });

    sup.spawn(vec![
        TaskSpec::bridge("app", run_loop),
        TaskSpec::member(bad),
        TaskSpec::member(idle("steady")),
    ])
    .unwrap();

    wait_for(&sup, "bad", TaskState::Failed).await;
    wait_for(&sup, "steady", TaskState::Running).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        sup.state(sup.id_of("steady").unwrap()),
        Some(TaskState::Running)
    );
    assert_eq!(
        sup.state(sup.id_of("app").unwrap()),
        Some(TaskState::Running)
    );

    release.send(()).unwrap();
    let err = sup.wait_all().await.unwrap_err();
    match err {
        RuntimeError::MemberFailed { task, error } => {
            assert_eq!(task, "bad");
            assert_eq!(error.as_label(), "task_failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let report = sup.report();
    assert_eq!(report.state("steady"), Some(TaskState::Cancelled));
    assert_eq!(report.state("app"), Some(TaskState::Completed));
}

#[tokio::test]
async fn cancel_is_idempotent_and_ignores_terminal_members() {
    let sup = Supervisor::builder(Config::default()).build();
    let (release, run_loop) = gated_loop();
    let done = TaskFn::arc("done", |_ctx: CancellationToken| async {
        Ok::<(), TaskError>(())
    });

    let ids = sup
        .spawn(vec![
            TaskSpec::bridge("app", run_loop),
            TaskSpec::member(done),
            TaskSpec::member(idle("victim")),
        ])
        .unwrap();
    wait_for(&sup, "done", TaskState::Completed).await;

    assert!(!sup.cancel(ids[1]));
    assert!(sup.cancel(ids[2]));
    assert!(!sup.cancel(ids[2]));
    wait_for(&sup, "victim", TaskState::Cancelled).await;
    assert!(!sup.cancel(ids[2]));

    release.send(()).unwrap();
    let report = sup.wait_all().await.unwrap();
    assert_eq!(report.state("done"), Some(TaskState::Completed));
    assert_eq!(report.state("victim"), Some(TaskState::Cancelled));
}

#[tokio::test]
async fn phases_only_move_forward() {
    let sup = Supervisor::builder(Config::default()).build();
    assert_eq!(sup.phase(), Phase::Spawning);

    let (release, run_loop) = gated_loop();
    sup.spawn(vec![
        TaskSpec::bridge("app", run_loop),
        TaskSpec::member(idle("a")),
    ])
    .unwrap();
    assert_eq!(sup.phase(), Phase::Running);

    release.send(()).unwrap();
    sup.wait_all().await.unwrap();
    assert_eq!(sup.phase(), Phase::Done);
}

#[tokio::test]
async fn bridge_failure_still_cancels_siblings() {
    let sup = Supervisor::builder(Config::default()).build();
    let crash = || Err::<(), _>(ForeignLoopError::Engine("window manager died".into()));

    let err = sup
        .run(vec![
            TaskSpec::member(idle("a")),
            TaskSpec::bridge("app", crash),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.as_label(), "runtime_foreign_loop");

    let report = sup.report();
    assert_eq!(report.state("a"), Some(TaskState::Cancelled));
    assert_eq!(report.state("app"), Some(TaskState::Failed));
    assert!(report.members[1].error.as_deref().unwrap().contains("window manager died"));
}

#[tokio::test]
async fn stragglers_are_aborted_after_grace() {
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..Config::default()
    };
    let sup = Supervisor::builder(cfg).build();
    // Ignores its token entirely.
    let stubborn = TaskFn::arc("stubborn", |_ctx: CancellationToken| {
        std::future::pending::<Result<(), TaskError>>()
    });

    let err = sup
        .run(vec![
            TaskSpec::bridge("app", quick_loop()),
            TaskSpec::member(stubborn),
            TaskSpec::member(idle("polite")),
        ])
        .await
        .unwrap_err();

    match err {
        RuntimeError::GraceExceeded { stuck, .. } => assert_eq!(stuck, vec!["stubborn"]),
        other => panic!("unexpected error: {other:?}"),
    }
    let report = sup.report();
    assert!(report.all_terminal());
    assert_eq!(report.state("stubborn"), Some(TaskState::Cancelled));
    assert_eq!(report.state("polite"), Some(TaskState::Cancelled));
    assert_eq!(sup.phase(), Phase::Done);
}

#[tokio::test]
async fn group_is_validated_and_spawned_once() {
    let sup = Supervisor::builder(Config::default()).build();
    let err = sup
        .spawn(vec![
            TaskSpec::bridge("one", quick_loop()),
            TaskSpec::bridge("two", quick_loop()),
        ])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateBridge { count: 2 }));

    let err = sup
        .spawn(vec![TaskSpec::member(idle("x")), TaskSpec::member(idle("x"))])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateTask { .. }));

    assert!(matches!(
        sup.wait_all().await.unwrap_err(),
        RuntimeError::NotSpawned
    ));

    sup.spawn(vec![TaskSpec::bridge("app", quick_loop())]).unwrap();
    assert!(matches!(
        sup.spawn(vec![TaskSpec::member(idle("late"))]).unwrap_err(),
        RuntimeError::AlreadySpawned
    ));
    sup.wait_all().await.unwrap();
}

#[tokio::test]
async fn bridge_exit_cancels_siblings_without_waiting() {
    let sup = Supervisor::builder(Config::default()).build();
    let mut events = sup.subscribe();
    let (release, run_loop) = gated_loop();
    sup.spawn(vec![
        TaskSpec::bridge("app", run_loop),
        TaskSpec::member(idle("idle")),
    ])
    .unwrap();
    wait_for(&sup, "idle", TaskState::Running).await;

    // Nobody calls wait_all; the bridge's exit alone must stop the sibling.
    release.send(()).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        wait_for(&sup, "app", TaskState::Completed),
    )
    .await
    .expect("run loop never returned");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        sup.state(sup.id_of("idle").unwrap()),
        Some(TaskState::Cancelled)
    );

    let mut requests = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::CancelRequested {
            requests.push(ev.task.unwrap().to_string());
        }
    }
    assert_eq!(requests, vec!["idle"]);

    // A late wait_all still drains cleanly.
    let report = sup.wait_all().await.unwrap();
    assert_eq!(report.state("idle"), Some(TaskState::Cancelled));
}

#[tokio::test]
async fn sibling_leaves_running_as_soon_as_the_loop_returns() {
    let sup = Supervisor::builder(Config::default()).build();
    let (release, run_loop) = gated_loop();
    sup.spawn(vec![
        TaskSpec::bridge("app", run_loop),
        TaskSpec::member(idle("idle")),
    ])
    .unwrap();
    wait_for(&sup, "idle", TaskState::Running).await;

    release.send(()).unwrap();
    let app = sup.id_of("app").unwrap();
    let idle = sup.id_of("idle").unwrap();
    while sup.state(app) != Some(TaskState::Completed) {
        tokio::task::yield_now().await;
    }
    // The request is already out by the time the bridge is observed terminal.
    assert!(!sup.cancel(idle));
    tokio::time::timeout(
        Duration::from_secs(1),
        wait_for(&sup, "idle", TaskState::Cancelled),
    )
    .await
    .expect("sibling kept running after the run loop returned");
    sup.wait_all().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn grace_is_measured_from_the_loop_exit() {
    let cfg = Config {
        grace: Duration::from_millis(50),
        ..Config::default()
    };
    let sup = Supervisor::builder(cfg).build();
    let stubborn = TaskFn::arc("stubborn", |_ctx: CancellationToken| {
        std::future::pending::<Result<(), TaskError>>()
    });
    sup.spawn(vec![
        TaskSpec::bridge("app", || Ok::<(), ForeignLoopError>(())),
        TaskSpec::member(stubborn),
    ])
    .unwrap();
    while sup.state(sup.id_of("app").unwrap()) != Some(TaskState::Completed) {
        tokio::task::yield_now().await;
    }

    // Waiting starts well after the grace period ran out.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let started = tokio::time::Instant::now();
    let err = sup.wait_all().await.unwrap_err();
    assert!(matches!(err, RuntimeError::GraceExceeded { .. }));
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[derive(Default)]
struct Recorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn subscribers_are_flushed_before_wait_all_returns() {
    let recorder = Arc::new(Recorder::default());
    let sup = Supervisor::builder(Config::default())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();
    assert_eq!(sup.subscriber_count(), 1);

    sup.run(vec![
        TaskSpec::bridge("app", quick_loop()),
        TaskSpec::member(idle("a")),
    ])
    .await
    .unwrap();

    let seen = recorder.0.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&EventKind::GroupSpawned));
    assert_eq!(seen.last(), Some(&EventKind::GroupDone));
    assert!(seen.contains(&EventKind::RunLoopExited));
    assert!(seen.contains(&EventKind::CancelRequested));
}

#[tokio::test]
async fn wait_all_after_done_returns_the_final_report() {
    let sup = Supervisor::builder(Config::default()).build();
    let first = sup
        .run(vec![
            TaskSpec::bridge("app", quick_loop()),
            TaskSpec::member(idle("a")),
        ])
        .await
        .unwrap();

    let again = sup.wait_all().await.unwrap();
    assert_eq!(sup.phase(), Phase::Done);
    assert_eq!(again.state("app"), first.state("app"));
    assert_eq!(again.state("a"), Some(TaskState::Cancelled));
}
