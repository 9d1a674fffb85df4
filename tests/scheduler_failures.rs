// tests/scheduler_failures.rs

mod common;

use common::{init_tracing, mock_context};

use makedag::errors::MakeError;
use makedag::fs::MockFileSystem;
use makedag::graph::MadeState;
use makedag::make::{GoalOutcome, Scheduler};
use makedag_test_utils::builders::{BuildFileBuilder, DependencyBuilder};
use makedag_test_utils::driver::SyncDriver;

fn two_leaves() -> BuildFileBuilder {
    BuildFileBuilder::new()
        .rule("all", &["a", "b"], &["link all"])
        .rule("a", &[], &["build a"])
        .rule("b", &[], &["build b"])
}

#[test]
fn first_failure_stops_the_build() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = two_leaves().build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs))
        .with_fs(fs.clone())
        .failing("a");
    let report = driver.run_names(&["all"]);

    assert_eq!(driver.executed, vec!["a"]);
    assert!(!report.success());
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.failed_jobs, vec![("a".to_string(), 1)]);
    assert_eq!(report.goals[0].outcome, GoalOutcome::NotRemade);
    assert!(driver.scheduler.is_aborting());
    assert_eq!(driver.made("a"), MadeState::Error);
    assert_eq!(driver.made("all"), MadeState::Aborted);
}

#[test]
fn keep_going_builds_unrelated_targets() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = two_leaves().keep_going(true).build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs))
        .with_fs(fs.clone())
        .failing("a");
    let report = driver.run_names(&["all"]);

    assert_eq!(driver.executed, vec!["a", "b"]);
    assert_eq!(driver.made("b"), MadeState::Made);
    assert_eq!(driver.made("all"), MadeState::Aborted);
    assert_eq!(report.goals[0].outcome, GoalOutcome::NotRemade);
    assert_eq!(
        report.goals[0].to_string(),
        "`all' not remade because of errors"
    );
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn ignored_failures_count_as_made() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = two_leaves().ignore_errors(true).build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs))
        .with_fs(fs.clone())
        .failing("a");
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["a", "b", "all"]);
    assert_eq!(report.goals[0].outcome, GoalOutcome::Made);
}

#[test]
fn dependency_cycle_is_reported() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new()
        .rule("a", &["b"], &["build a"])
        .rule("b", &["a"], &["build b"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["a"]);

    assert!(driver.executed.is_empty());
    assert_eq!(report.cycles, vec![vec!["a".to_string(), "b".to_string()]]);
    assert_eq!(report.goals[0].outcome, GoalOutcome::Unfinished);
    assert!(
        report
            .problems
            .iter()
            .any(|p| matches!(p, MakeError::GraphCycle(names) if names == "a, b"))
    );
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn missing_source_without_rule_is_an_error() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new()
        .rule("all", &["missing.c"], &["cc missing.c"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["all"]);

    assert!(driver.executed.is_empty());
    assert_eq!(report.errors, 1);
    assert_eq!(report.exit_code(), 2);
    let problem = report
        .problems
        .iter()
        .find(|p| matches!(p, MakeError::DontKnowHowToMake(_)))
        .expect("unbuildable source reported");
    assert_eq!(problem.to_string(), "don't know how to make missing.c");
    assert_eq!(driver.made("missing.c"), MadeState::Error);
    assert_eq!(report.goals[0].outcome, GoalOutcome::NotRemade);
}

#[test]
fn existing_source_without_rule_is_fine() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("present.c", 100);
    let file = BuildFileBuilder::new()
        .rule("all", &["present.c"], &["cc present.c"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["all"]);
    assert_eq!(driver.made("present.c"), MadeState::UpToDate);
}

#[test]
fn default_recipe_is_used_for_sources_nobody_knows_how_to_make() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new()
        .rule("all", &["missing.c"], &["cc missing.c"])
        .dependency(
            DependencyBuilder::new(&[".DEFAULT"])
                .command("fetch ${.IMPSRC}")
                .build(),
        )
        .build();

    let mut scheduler = Scheduler::new(mock_context(&file, &fs));
    let all = scheduler.graph().find("all").expect("all declared");
    scheduler.prepare(&[all]);

    let step = scheduler.start_jobs();
    assert_eq!(step.jobs.len(), 1);
    assert_eq!(step.jobs[0].name, "missing.c");
    assert_eq!(step.jobs[0].commands, vec!["fetch missing.c"]);
    assert_eq!(scheduler.error_count(), 0);
}

#[test]
fn query_reports_stale_goals_without_running_anything() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = two_leaves().query(true).build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["all"]);

    assert!(driver.executed.is_empty());
    assert!(report.query_out_of_date);
    assert!(!report.success());
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn query_on_current_goals_exits_zero() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("a", 100);
    fs.add_file("b", 100);
    fs.add_file("all", 200);
    let file = two_leaves().query(true).build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["all"]);

    assert!(driver.executed.is_empty());
    assert!(!report.query_out_of_date);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.goals[0].outcome, GoalOutcome::UpToDate);
}

#[test]
fn no_execute_marks_jobs_and_still_walks_the_graph() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = two_leaves().no_execute(true).build();

    let mut scheduler = Scheduler::new(mock_context(&file, &fs));
    let all = scheduler.graph().find("all").expect("all declared");
    scheduler.prepare(&[all]);

    let step = scheduler.start_jobs();
    assert_eq!(step.jobs.len(), 1);
    assert!(step.jobs[0].no_execute);

    // Nothing is created, yet parents still become out of date.
    let mut seen = Vec::new();
    let mut pending = step.jobs;
    while let Some(job) = pending.pop() {
        seen.push(job.name.clone());
        scheduler.complete(job.node, makedag::engine::JobOutcome::Success);
        pending.extend(scheduler.start_jobs().jobs);
    }
    assert_eq!(seen, vec!["a", "b", "all"]);

    let report = scheduler.finish();
    assert!(report.success(), "report: {report:?}");
}

#[test]
fn failed_cohort_aborts_parents_of_the_double_colon_target() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new()
        .keep_going(true)
        .rule("all", &["X", "y"], &[])
        .dependency(DependencyBuilder::new(&["X"]).double_colon().source("a").build())
        .dependency(DependencyBuilder::new(&["X"]).double_colon().source("b").build())
        .rule("a", &[], &["build a"])
        .rule("b", &[], &["build b"])
        .rule("y", &[], &["build y"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs))
        .with_fs(fs.clone())
        .failing("b");
    let report = driver.run_names(&["all"]);

    assert_eq!(driver.made("y"), MadeState::Made);
    assert_eq!(driver.made("b"), MadeState::Error);
    let cohort = driver.scheduler.graph().node(driver.id("X")).cohorts[0];
    assert_eq!(driver.scheduler.graph().node(cohort).made, MadeState::Aborted);
    assert_eq!(driver.made("all"), MadeState::Aborted);
    assert_eq!(report.goals[0].outcome, GoalOutcome::NotRemade);
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn unmade_count_underflow_is_reported_once_as_an_error() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = two_leaves().jobs(2).build();

    let mut scheduler = Scheduler::new(mock_context(&file, &fs));
    let all = scheduler.graph().find("all").expect("all declared");
    scheduler.prepare(&[all]);

    let step = scheduler.start_jobs();
    assert_eq!(step.jobs.len(), 2);

    // Both completions find nothing left to count down on `all`.
    scheduler.context_mut().graph.node_mut(all).unmade = 0;
    for job in step.jobs {
        scheduler.complete(job.node, makedag::engine::JobOutcome::Success);
    }
    assert_eq!(scheduler.error_count(), 1);

    let report = scheduler.finish();
    assert!(!report.success());
    assert_eq!(report.errors, 1);
    let cycles: Vec<&MakeError> = report
        .problems
        .iter()
        .filter(|p| matches!(p, MakeError::GraphCycle(_)))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert!(matches!(cycles[0], MakeError::GraphCycle(name) if name == "all"));
    assert_eq!(report.exit_code(), 2);
}
