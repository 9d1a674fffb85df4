// tests/out_of_date.rs

mod common;

use common::{init_tracing, mock_context};

use makedag::fs::MockFileSystem;
use makedag::make::expand::expand_use;
use makedag::make::{BuildContext, GoalOutcome, is_out_of_date};
use makedag_test_utils::builders::{BuildFileBuilder, DependencyBuilder};
use makedag_test_utils::driver::SyncDriver;

fn check(ctx: &mut BuildContext, name: &str) -> bool {
    let id = ctx.graph.find(name).expect("node declared");
    is_out_of_date(ctx, id)
}

#[test]
fn missing_target_is_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new().rule("foo", &[], &["touch foo"]).build();

    let mut ctx = mock_context(&file, &fs);
    assert!(check(&mut ctx, "foo"));
}

#[test]
fn existing_target_without_sources_is_current() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("foo", 100);
    let file = BuildFileBuilder::new().rule("foo", &[], &["touch foo"]).build();

    let mut ctx = mock_context(&file, &fs);
    assert!(!check(&mut ctx, "foo"));
}

#[test]
fn phony_target_is_always_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("clean", 100);
    let file = BuildFileBuilder::new()
        .rule("clean", &[], &["rm -f *.o"])
        .dependency(DependencyBuilder::new(&[".PHONY"]).source("clean").build())
        .build();

    let mut ctx = mock_context(&file, &fs);
    assert!(check(&mut ctx, "clean"));
}

#[test]
fn force_operator_is_always_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("gen", 100);
    let file = BuildFileBuilder::new()
        .dependency(DependencyBuilder::new(&["gen"]).force().command("generate").build())
        .build();

    let mut ctx = mock_context(&file, &fs);
    assert!(check(&mut ctx, "gen"));
}

#[test]
fn double_colon_target_without_sources_is_always_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("stamp", 100);
    let file = BuildFileBuilder::new()
        .dependency(DependencyBuilder::new(&["stamp"]).double_colon().command("date").build())
        .build();

    let mut ctx = mock_context(&file, &fs);
    assert!(check(&mut ctx, "stamp"));
}

#[test]
fn missing_optional_node_is_not_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new()
        .rule("maybe", &[".OPTIONAL"], &[])
        .build();

    let mut ctx = mock_context(&file, &fs);
    assert!(!check(&mut ctx, "maybe"));
}

#[test]
fn suffixless_target_compares_against_its_explicit_child_every_time() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("foo", 100);
    fs.add_file("bar.c", 200);
    let file = BuildFileBuilder::new()
        .suffixes(&[".c", ".o"])
        .rule("foo", &["bar.c"], &["cc -o foo bar.c"])
        .build();

    let mut ctx = mock_context(&file, &fs);
    let foo = ctx.graph.find("foo").expect("foo declared");
    expand_use(&mut ctx, &[foo]);

    assert!(!check(&mut ctx, "bar.c"));
    assert_eq!(ctx.graph.node(foo).children.len(), 1);
    assert!(check(&mut ctx, "foo"));
    assert!(check(&mut ctx, "foo"), "re-evaluation changes nothing");

    fs.touch("foo", makedag::types::MTime::from_secs(300));
    assert!(!check(&mut ctx, "foo"));
    assert!(!check(&mut ctx, "foo"));
}

#[test]
fn younger_source_triggers_rebuild_and_second_build_is_a_no_op() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("foo", 100);
    fs.add_file("bar.c", 200);
    let file = BuildFileBuilder::new()
        .rule("foo", &["bar.c"], &["cc -o foo bar.c"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["foo"]);
    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["foo"]);
    assert_eq!(report.goals[0].outcome, GoalOutcome::Made);

    let mut again = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = again.run_names(&["foo"]);
    assert!(report.success(), "report: {report:?}");
    assert!(again.executed.is_empty(), "rebuilt: {:?}", again.executed);
    assert_eq!(report.goals[0].outcome, GoalOutcome::UpToDate);
}

#[test]
fn newer_target_is_up_to_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("foo", 300);
    fs.add_file("bar.c", 200);
    let file = BuildFileBuilder::new()
        .rule("foo", &["bar.c"], &["cc -o foo bar.c"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["foo"]);

    assert!(driver.executed.is_empty());
    assert_eq!(report.goals[0].outcome, GoalOutcome::UpToDate);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn target_is_remade_when_a_source_that_stays_missing_was_made() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("foo", 300);
    let file = BuildFileBuilder::new()
        .rule("foo", &["gen"], &["assemble foo"])
        .rule("gen", &[], &["echo generating"])
        .build();

    // No file system: `gen` never appears on disk.
    let mut driver = SyncDriver::new(mock_context(&file, &fs));
    let report = driver.run_names(&["foo"]);

    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["gen", "foo"]);
    let graph = driver.scheduler.graph();
    assert!(graph.node(driver.id("foo")).flags.force);
}

#[test]
fn evaluation_after_the_children_were_built_is_repeatable() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("bar.c", 100);
    let file = BuildFileBuilder::new()
        .rule("foo", &["bar.o"], &["ld -o foo bar.o"])
        .rule("bar.o", &["bar.c"], &["cc -c bar.c"])
        .build();

    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["foo"]);
    assert!(report.success(), "report: {report:?}");
    assert_eq!(driver.executed, vec!["bar.o", "foo"]);

    let ctx = driver.scheduler.context_mut();
    assert!(!check(ctx, "bar.o"));
    assert!(!check(ctx, "foo"));
    assert!(!check(ctx, "foo"), "re-evaluation changes nothing");

    fs.touch("bar.o", makedag::types::MTime::from_secs(5_000_000));
    assert!(!check(ctx, "bar.o"));
    assert!(check(ctx, "foo"));
    assert!(check(ctx, "foo"));
}
