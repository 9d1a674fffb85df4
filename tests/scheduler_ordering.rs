// tests/scheduler_ordering.rs

mod common;

use common::{first_transition, init_tracing, last_transition, mock_context};

use makedag::fs::MockFileSystem;
use makedag::graph::MadeState;
use makedag_test_utils::builders::{BuildFileBuilder, DependencyBuilder};
use makedag_test_utils::driver::SyncDriver;

fn leaves(builder: BuildFileBuilder, names: &[&str]) -> BuildFileBuilder {
    names.iter().fold(builder, |b, name| {
        b.rule(name, &[], &[format!("build {name}").as_str()])
    })
}

#[test]
fn wait_barrier_holds_later_siblings_until_earlier_ones_are_made() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = leaves(
        BuildFileBuilder::new()
            .jobs(4)
            .rule("all", &["a", "b", ".WAIT", "c", "d"], &[]),
        &["a", "b", "c", "d"],
    )
    .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["a", "b", "c", "d"]);
    assert_eq!(driver.max_outstanding, 2);

    let s = &driver.scheduler;
    let a_made = first_transition(s, "a", MadeState::Made).expect("a made");
    let b_made = first_transition(s, "b", MadeState::Made).expect("b made");
    let wait_made = first_transition(s, ".WAIT_1", MadeState::Made).expect("barrier made");
    for later in ["c", "d"] {
        let requested = first_transition(s, later, MadeState::Requested).expect("requested");
        assert!(requested > a_made && requested > b_made, "{later} requested too early");
        assert!(requested > wait_made, "{later} requested before the barrier");
    }
}

#[test]
fn order_constraint_runs_predecessor_first() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = leaves(
        BuildFileBuilder::new()
            .jobs(2)
            .rule("all", &["a", "b"], &[])
            .dependency(DependencyBuilder::new(&[".ORDER"]).sources(&["b", "a"]).build()),
        &["a", "b"],
    )
    .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["b", "a"]);
    assert_eq!(driver.max_outstanding, 1);

    let s = &driver.scheduler;
    let b_made = first_transition(s, "b", MadeState::Made).expect("b made");
    let a_requested = last_transition(s, "a", MadeState::Requested).expect("a requested");
    assert!(a_requested > b_made);
}

#[test]
fn declared_order_is_kept_without_constraints() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = leaves(
        BuildFileBuilder::new().rule("all", &["a", "b", "c"], &[]),
        &["a", "b", "c"],
    )
    .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    driver.run_names(&["all"]);

    assert_eq!(driver.executed, vec!["a", "b", "c"]);
}

#[test]
fn double_colon_parent_waits_for_every_cohort() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("x", 100);
    fs.add_file("y", 100);
    let file = BuildFileBuilder::new()
        .rule("top", &["all"], &[])
        .dependency(
            DependencyBuilder::new(&["all"])
                .double_colon()
                .source("x")
                .command("from x")
                .build(),
        )
        .dependency(
            DependencyBuilder::new(&["all"])
                .double_colon()
                .source("y")
                .command("from y")
                .build(),
        )
        .build();

    // Targets are never created, so every cohort stays out of date.
    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["top"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["all", "all#1"]);

    let s = &driver.scheduler;
    let first_made = first_transition(s, "all", MadeState::Made).expect("centurion made");
    let second_made = first_transition(s, "all#1", MadeState::Made).expect("cohort made");
    let top_requested = last_transition(s, "top", MadeState::Requested).expect("top requested");
    assert!(first_made < second_made);
    assert!(
        top_requested > second_made,
        "top became ready before the last cohort was made"
    );
    assert_eq!(s.graph().node(driver.id("all")).unmade_cohorts, 0);
}

#[test]
fn token_pool_bounds_outstanding_jobs() {
    init_tracing();
    let fs = MockFileSystem::new();
    let names = ["a", "b", "c", "d", "e"];
    let file = leaves(
        BuildFileBuilder::new().jobs(2).rule("all", &names, &[]),
        &names,
    )
    .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed.len(), 5);
    assert_eq!(driver.max_outstanding, 2);
    assert_eq!(driver.scheduler.outstanding_jobs(), 0);
}

#[test]
fn completion_order_does_not_matter() {
    init_tracing();
    let fs = MockFileSystem::new();
    let names = ["a", "b", "c", "d"];
    let file = leaves(
        BuildFileBuilder::new()
            .jobs(3)
            .rule("all", &names, &["link all"]),
        &names,
    )
    .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs))
        .with_fs(fs.clone())
        .newest_first();
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed.len(), 5);
    assert_eq!(driver.executed.last().map(String::as_str), Some("all"));
    assert!(driver.max_outstanding <= 3);
}

#[test]
fn seeded_random_order_is_reproducible() {
    init_tracing();
    let names = ["a", "b", "c", "d", "e", "f"];
    let build = || {
        let fs = MockFileSystem::new();
        let file = leaves(
            BuildFileBuilder::new()
                .randomize(7)
                .rule("all", &names, &[]),
            &names,
        )
        .build();
        let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
        let report = driver.run_names(&["all"]);
        assert!(report.success(), "report: {report:?}");
        driver.executed
    };

    let first = build();
    let second = build();
    assert_eq!(first, second);

    let mut sorted = first.clone();
    sorted.sort();
    assert_eq!(sorted, names);
}

#[test]
fn main_target_is_the_first_eligible_declared_target() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = leaves(
        BuildFileBuilder::new()
            .dependency(
                DependencyBuilder::new(&[".BEGIN"])
                    .command("echo starting")
                    .build(),
            )
            .rule("prog", &["a"], &["link prog"]),
        &["a"],
    )
    .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_main();

    assert!(report.success(), "report: {report:?}");
    assert_eq!(report.goals.len(), 1);
    assert_eq!(report.goals[0].name, "prog");
    assert_eq!(driver.executed, vec!["a", "prog"]);
}

#[test]
fn order_successor_of_a_double_colon_group_waits_for_the_last_cohort() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = leaves(
        BuildFileBuilder::new()
            .jobs(4)
            .rule("all", &["X", "z"], &[])
            .dependency(
                DependencyBuilder::new(&["X"])
                    .double_colon()
                    .source("a")
                    .command("build X")
                    .build(),
            )
            .dependency(
                DependencyBuilder::new(&["X"])
                    .double_colon()
                    .source("b")
                    .command("build X again")
                    .build(),
            )
            .dependency(DependencyBuilder::new(&[".ORDER"]).sources(&["X", "z"]).build()),
        &["a", "b", "z"],
    )
    .build();

    // Targets are never created, so both cohorts run.
    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["all"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["a", "b", "X", "X#1", "z"]);

    let s = &driver.scheduler;
    let cohort_made = first_transition(s, "X#1", MadeState::Made).expect("cohort made");
    let z_requested = first_transition(s, "z", MadeState::Requested).expect("z requested");
    assert!(z_requested > cohort_made, "z requested before the whole group was made");
}
