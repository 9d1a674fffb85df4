// src/lib.rs

pub mod archive;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod make;
pub mod suffix;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{build_context, build_options, load_and_validate, resolve_goals};
use crate::engine::{Runtime, RuntimeEvent};
use crate::exec::{JobRunner, ShellJobRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::NodeId;
use crate::make::expand::expand_use;
use crate::make::{BuildContext, BuildOptions, BuildReport, Scheduler};
use crate::types::ChildOrder;

/// High-level entry point used by `main.rs`; returns the process exit code.
///
/// This wires together:
/// - build file loading and graph population
/// - scheduler and runtime
/// - the shell job runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let path = PathBuf::from(&args.file);
    let file = load_and_validate(&path)?;

    let mut options = build_options(&file.config);
    apply_cli_overrides(&args, &mut options);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::new());
    let mut ctx = build_context(&file, fs, options)?;

    let goals = if args.targets.is_empty() {
        ctx.graph.main_targets().to_vec()
    } else {
        resolve_goals(&mut ctx, &args.targets)
    };
    if goals.is_empty() {
        bail!("no target to make (empty build file and no goals given)");
    }

    if args.print_graph {
        print_graph(&mut ctx, &goals);
        return Ok(0);
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let runner = ShellJobRunner::new(rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let mut runtime = Runtime::new(Scheduler::new(ctx), rt_rx, runner);
    let report = build_phases(&mut runtime, &goals).await?;

    for (node, code) in &report.failed_jobs {
        eprintln!("*** [{node}] Error code {code}");
    }
    for problem in &report.problems {
        eprintln!("makedag: {problem}");
    }
    if report.query_out_of_date {
        debug!("query: goals are out of date");
    }
    Ok(report.exit_code())
}

/// Run `.BEGIN`, the goals and `.END`, in that order.
///
/// `.BEGIN` and `.END` only run if they have a recipe; `.END` only after
/// the goals succeeded. Query mode skips both.
pub async fn build_phases<R: JobRunner>(
    runtime: &mut Runtime<R>,
    goals: &[NodeId],
) -> Result<BuildReport> {
    let query = runtime.scheduler().context().options.query;

    if !query && let Some(begin) = special_with_commands(runtime.scheduler(), ".BEGIN") {
        info!("running .BEGIN");
        let report = runtime.make(&[begin]).await?;
        if !report.success() {
            warn!("stopping after .BEGIN failed");
            return Ok(report);
        }
    }

    let mut report = runtime.make(goals).await?;

    if !query
        && report.success()
        && !runtime.shutdown_requested()
        && let Some(end) = special_with_commands(runtime.scheduler(), ".END")
    {
        info!("running .END");
        let end_report = runtime.make(&[end]).await?;
        report.merge(end_report);
    }
    Ok(report)
}

fn special_with_commands(scheduler: &Scheduler, name: &str) -> Option<NodeId> {
    let graph = scheduler.graph();
    graph
        .find(name)
        .filter(|id| !graph.node(*id).commands.is_empty())
}

fn apply_cli_overrides(args: &CliArgs, options: &mut BuildOptions) {
    if let Some(jobs) = args.jobs {
        options.jobs = jobs.max(1);
    }
    options.keep_going |= args.keep_going;
    options.ignore_errors |= args.ignore_errors;
    options.no_execute |= args.no_execute;
    options.query |= args.query;
    options.silent |= args.silent;
    if args.randomize {
        options.child_order = ChildOrder::Random;
    }
    if args.seed.is_some() {
        options.random_seed = args.seed;
    }
}

/// Resolve implicit sources below `goals` and print the resulting graph.
fn print_graph(ctx: &mut BuildContext, goals: &[NodeId]) {
    expand_use(ctx, goals);

    println!("#*** Suffixes:");
    for &id in ctx.suffixes.list() {
        let suffix = ctx.suffixes.get(id);
        println!(
            "# {} (seq {}) from: {} to: {}",
            suffix.name,
            suffix.seq,
            ctx.suffixes.child_names(id).join(" "),
            ctx.suffixes.parent_names(id).join(" "),
        );
    }
    if !ctx.suffixes.include_flags().is_empty() {
        println!("# .INCLUDES = {}", ctx.suffixes.include_flags());
    }
    if !ctx.suffixes.library_flags().is_empty() {
        println!("# .LIBS = {}", ctx.suffixes.library_flags());
    }

    println!();
    println!("#*** Transformations:");
    for &rule in ctx.suffixes.transforms() {
        let node = ctx.graph.node(rule);
        println!("{}:", node.name);
        for line in &node.commands {
            println!("\t{line}");
        }
    }

    println!();
    println!("#*** Graph:");
    for id in ctx.graph.ids() {
        let node = ctx.graph.node(id);
        if !node.flags.remake {
            continue;
        }
        let children: Vec<&str> = node.children.iter().map(|c| ctx.graph.name(*c)).collect();
        println!("# {:?}, mtime {:?}", node.kind, node.mtime.map(|m| m.to_string()));
        if let Some(path) = &node.path {
            println!("# path {}", path.display());
        }
        println!("{}: {}", node.display_name(), children.join(" "));
        for line in &node.commands {
            println!("\t{line}");
        }
        println!();
    }
}
