// tests/node_attributes.rs

mod common;

use common::{child_names, init_tracing, mock_context};

use makedag::engine::JobOutcome;
use makedag::fs::MockFileSystem;
use makedag::make::expand::expand_use;
use makedag::make::{BuildContext, GoalOutcome, Scheduler, is_out_of_date};
use makedag_test_utils::builders::BuildFileBuilder;
use makedag_test_utils::driver::SyncDriver;

fn check(ctx: &mut BuildContext, name: &str) -> bool {
    let id = ctx.graph.find(name).expect("node declared");
    is_out_of_date(ctx, id)
}

#[test]
fn use_and_usebefore_nodes_are_never_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("old-input", 500);
    let file = BuildFileBuilder::new()
        .rule("after", &[".USE", "old-input"], &["echo after"])
        .rule("before", &[".USEBEFORE"], &["echo before"])
        .build();

    let mut ctx = mock_context(&file, &fs);
    assert!(!check(&mut ctx, "after"));
    assert!(!check(&mut ctx, "before"));
    assert!(!check(&mut ctx, "after"), "second evaluation agrees");
}

#[test]
fn exec_node_is_always_out_of_date() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("stamp", 900);
    let file = BuildFileBuilder::new()
        .rule("stamp", &[".EXEC"], &["date"])
        .build();

    let mut ctx = mock_context(&file, &fs);
    assert!(check(&mut ctx, "stamp"));
    assert!(check(&mut ctx, "stamp"));
}

#[test]
fn use_recipes_and_sources_are_folded_into_the_target() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("prog.c", 100);
    let file = BuildFileBuilder::new()
        .rule("prog", &["setup", "pre", "prog.c"], &["cc prog.c"])
        .rule("setup", &[".USE", "helper"], &["echo setup ${.TARGET}"])
        .rule("pre", &[".USEBEFORE"], &["echo first"])
        .rule("helper", &[], &["make helper"])
        .build();

    let mut ctx = mock_context(&file, &fs);
    let prog = ctx.graph.find("prog").expect("prog declared");
    expand_use(&mut ctx, &[prog]);

    let node = ctx.graph.node(prog);
    assert_eq!(node.commands, vec!["echo first", "cc prog.c", "echo setup ${.TARGET}"]);
    let children: Vec<&str> = node.children.iter().map(|c| ctx.graph.name(*c)).collect();
    assert_eq!(children, vec!["prog.c", "helper"]);
    let setup = ctx.graph.find("setup").expect("setup declared");
    assert!(!ctx.graph.node(setup).parents.contains(&prog));
}

#[test]
fn use_recipe_runs_with_the_target_variables() {
    init_tracing();
    let fs = MockFileSystem::new();
    let file = BuildFileBuilder::new()
        .rule("prog", &["setup"], &[])
        .rule("setup", &[".USE"], &["echo setup ${.TARGET}"])
        .build();

    let mut scheduler = Scheduler::new(mock_context(&file, &fs));
    let prog = scheduler.graph().find("prog").expect("prog declared");
    scheduler.prepare(&[prog]);

    let step = scheduler.start_jobs();
    assert_eq!(step.jobs.len(), 1);
    assert_eq!(step.jobs[0].name, "prog");
    assert_eq!(step.jobs[0].commands, vec!["echo setup prog"]);
    assert!(child_names(&scheduler, "prog").is_empty());
}

#[test]
fn join_node_is_current_unless_a_child_was_rebuilt() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("a", 100);
    fs.add_file("b", 100);
    let file = BuildFileBuilder::new()
        .rule("list", &[".JOIN", "a", "b"], &["ls ${.OODATE}"])
        .build();

    // `list` itself never exists; only rebuilt children matter.
    let mut driver = SyncDriver::new(mock_context(&file, &fs)).with_fs(fs.clone());
    let report = driver.run_names(&["list"]);

    assert!(report.success(), "report: {report:?}");
    assert!(driver.executed.is_empty(), "ran: {:?}", driver.executed);
    assert_eq!(report.goals[0].outcome, GoalOutcome::UpToDate);
}

#[test]
fn join_node_runs_once_a_child_is_rebuilt() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("a", 100);
    let file = BuildFileBuilder::new()
        .rule("list", &[".JOIN", "a", "b"], &["ls ${.OODATE}"])
        .rule("b", &[], &["make b"])
        .build();

    let mut scheduler = Scheduler::new(mock_context(&file, &fs));
    let list = scheduler.graph().find("list").expect("list declared");
    scheduler.prepare(&[list]);

    let step = scheduler.start_jobs();
    assert_eq!(step.jobs.len(), 1);
    assert_eq!(step.jobs[0].name, "b");
    scheduler.complete(step.jobs[0].node, JobOutcome::Success);

    let step = scheduler.start_jobs();
    assert_eq!(step.jobs.len(), 1);
    assert_eq!(step.jobs[0].name, "list");
    assert_eq!(step.jobs[0].target, "a b");
    assert_eq!(step.jobs[0].commands, vec!["ls b"]);
    assert!(scheduler.graph().node(list).flags.child_made);
}
