// tests/runtime_fake_runner.rs

mod common;

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{init_tracing, mock_context};

use tokio::sync::mpsc;

use makedag::build_phases;
use makedag::config::BuildFile;
use makedag::engine::{Runtime, RuntimeEvent};
use makedag::fs::MockFileSystem;
use makedag::make::{GoalOutcome, Scheduler};
use makedag_test_utils::builders::{BuildFileBuilder, DependencyBuilder};
use makedag_test_utils::fake_runner::{FakeJobRunner, RunLog};
use makedag_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

/// `all` links `a` and `b`.
fn simple_build() -> BuildFileBuilder {
    BuildFileBuilder::new()
        .rule("all", &["a", "b"], &["link ${.ALLSRC} -o ${.TARGET}"])
        .rule("a", &[], &["build ${.TARGET}"])
        .rule("b", &[], &["build ${.TARGET}"])
}

fn runtime_for(
    file: &BuildFile,
    fs: &MockFileSystem,
) -> (Runtime<FakeJobRunner>, Arc<Mutex<RunLog>>, mpsc::Sender<RuntimeEvent>) {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let log = Arc::new(Mutex::new(RunLog::default()));
    let runner = FakeJobRunner::new(rt_tx.clone(), Arc::clone(&log)).with_fs(fs.clone());
    let scheduler = Scheduler::new(mock_context(file, fs));
    (Runtime::new(scheduler, rt_rx, runner), log, rt_tx)
}

#[tokio::test]
async fn runtime_with_fake_runner_builds_a_simple_tree() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let file = simple_build().build();
    let (mut runtime, log, _tx) = runtime_for(&file, &fs);

    let goals = runtime.scheduler().graph().main_targets().to_vec();
    let report = with_timeout(runtime.make(&goals)).await?;

    assert!(report.success(), "report: {report:?}");
    assert_eq!(report.goals[0].outcome, GoalOutcome::Made);

    let log = log.lock().unwrap();
    assert_eq!(log.executed, vec!["a", "b", "all"]);
    assert_eq!(log.commands[0], vec!["build a"]);
    assert_eq!(log.commands[2], vec!["link a b -o all"]);
    assert!(fs.mtime_of("all").is_some());
    Ok(())
}

#[tokio::test]
async fn overlapping_jobs_never_exceed_the_token_pool() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let names = ["a", "b", "c", "d", "e"];
    let file = names
        .iter()
        .fold(
            BuildFileBuilder::new().jobs(2).rule("all", &names, &[]),
            |b, name| b.rule(name, &[], &["sleep"]),
        )
        .build();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let log = Arc::new(Mutex::new(RunLog::default()));
    let runner = FakeJobRunner::new(rt_tx.clone(), Arc::clone(&log))
        .with_fs(fs.clone())
        .with_delay(Duration::from_millis(20));
    let scheduler = Scheduler::new(mock_context(&file, &fs));
    let mut runtime = Runtime::new(scheduler, rt_rx, runner);

    let goals = runtime.scheduler().graph().main_targets().to_vec();
    let report = with_timeout(runtime.make(&goals)).await?;

    assert!(report.success(), "report: {report:?}");
    let log = log.lock().unwrap();
    assert_eq!(log.executed.len(), 5);
    assert_eq!(log.max_in_flight, 2);
    assert_eq!(log.in_flight, 0);
    Ok(())
}

#[tokio::test]
async fn begin_and_end_wrap_the_goals() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let file = simple_build()
        .dependency(DependencyBuilder::new(&[".BEGIN"]).command("echo begin").build())
        .dependency(DependencyBuilder::new(&[".END"]).command("echo end").build())
        .build();
    let (mut runtime, log, _tx) = runtime_for(&file, &fs);

    let goals = runtime.scheduler().graph().main_targets().to_vec();
    let report = with_timeout(build_phases(&mut runtime, &goals)).await?;

    assert!(report.success(), "report: {report:?}");
    let log = log.lock().unwrap();
    assert_eq!(log.executed, vec![".BEGIN", "a", "b", "all", ".END"]);
    Ok(())
}

#[tokio::test]
async fn end_is_skipped_after_a_failure() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let file = simple_build()
        .dependency(DependencyBuilder::new(&[".END"]).command("echo end").build())
        .build();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let log = Arc::new(Mutex::new(RunLog::default()));
    let runner = FakeJobRunner::new(rt_tx.clone(), Arc::clone(&log))
        .with_fs(fs.clone())
        .failing("b");
    let scheduler = Scheduler::new(mock_context(&file, &fs));
    let mut runtime = Runtime::new(scheduler, rt_rx, runner);

    let goals = runtime.scheduler().graph().main_targets().to_vec();
    let report = with_timeout(build_phases(&mut runtime, &goals)).await?;

    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.failed_jobs, vec![("b".to_string(), 1)]);
    let log = log.lock().unwrap();
    assert_eq!(log.executed, vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_waits_for_running_jobs_and_starts_no_more() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let file = simple_build().build();
    let (mut runtime, log, tx) = runtime_for(&file, &fs);

    // Queued ahead of the first completion.
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let goals = runtime.scheduler().graph().main_targets().to_vec();
    let report = with_timeout(runtime.make(&goals)).await?;

    assert!(runtime.shutdown_requested());
    assert!(report.interrupted);
    assert!(!report.success());
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.goals[0].outcome, GoalOutcome::Unfinished);

    let log = log.lock().unwrap();
    assert_eq!(log.executed, vec!["a"]);
    Ok(())
}
