// src/config/apply.rs

//! Populate a [`BuildContext`] from a validated [`BuildFile`].
//!
//! Dependency lines are processed in file order, the way a makefile parser
//! feeds the graph: special targets adjust the suffix registry, search
//! paths and options; every other line declares targets, links sources and
//! attaches its recipe.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::archive::split_archive_member;
use crate::config::model::{BuildFile, ConfigSection, DependencyLine, PathSection, SuffixSection};
use crate::config::special::SpecialTarget;
use crate::errors::Result;
use crate::fs::{FileSystem, expand_wildcards, has_wildcards};
use crate::graph::{NodeId, NodeType};
use crate::make::{BuildContext, BuildOptions};
use crate::types::ChildOrder;

/// Translate `[config]` into scheduler options.
pub fn build_options(cfg: &ConfigSection) -> BuildOptions {
    BuildOptions {
        jobs: cfg.jobs.max(1),
        keep_going: cfg.keep_going,
        ignore_errors: cfg.ignore_errors,
        no_execute: cfg.no_execute,
        query: cfg.query,
        silent: cfg.silent,
        child_order: if cfg.randomize_targets {
            ChildOrder::Random
        } else {
            ChildOrder::Declared
        },
        random_seed: cfg.random_seed,
    }
}

/// Build the graph described by `file` on top of `fs`.
pub fn build_context(
    file: &BuildFile,
    fs: Arc<dyn FileSystem>,
    options: BuildOptions,
) -> Result<BuildContext> {
    let mut ctx = BuildContext::new(fs, options);
    populate(&mut ctx, file)?;
    Ok(ctx)
}

/// Apply every section of `file` to an existing context.
pub fn populate(ctx: &mut BuildContext, file: &BuildFile) -> Result<()> {
    apply_suffix_section(ctx, &file.suffixes);
    apply_path_section(ctx, &file.paths);

    let mut main_override = Vec::new();
    for line in &file.dependency {
        match single_special(line) {
            Some(special) => apply_special(ctx, special, line, &mut main_override)?,
            None => apply_dependency(ctx, line)?,
        }
    }

    main_override.extend(file.main.iter().map(|name| ctx.graph.get_or_create(name)));
    if !main_override.is_empty() {
        ctx.graph.set_main(main_override);
    }

    debug!(
        nodes = ctx.graph.len(),
        suffixes = ctx.suffixes.list().len(),
        transforms = ctx.suffixes.transforms().len(),
        main = ?ctx.graph.main_targets().iter().map(|id| ctx.graph.name(*id)).collect::<Vec<_>>(),
        "build graph populated"
    );
    Ok(())
}

fn single_special(line: &DependencyLine) -> Option<SpecialTarget> {
    match line.targets.as_slice() {
        [only] => SpecialTarget::parse(only),
        _ => None,
    }
}

fn apply_suffix_section(ctx: &mut BuildContext, section: &SuffixSection) {
    for name in &section.list {
        ctx.suffixes.add_suffix(&mut ctx.graph, name);
    }
    if let Some(null) = &section.null {
        ctx.suffixes.set_null(null);
    }
    for name in &section.include {
        ctx.suffixes.add_include(name);
    }
    for name in &section.library {
        ctx.suffixes.add_library(name);
    }
}

fn apply_path_section(ctx: &mut BuildContext, paths: &PathSection) {
    for dir in &paths.global {
        ctx.suffixes.add_global_dir(PathBuf::from(dir));
    }
    for (suffix, dirs) in &paths.suffix {
        for dir in dirs {
            ctx.suffixes.add_suffix_dir(suffix, PathBuf::from(dir));
        }
    }
}

fn apply_special(
    ctx: &mut BuildContext,
    special: SpecialTarget,
    line: &DependencyLine,
    main_override: &mut Vec<NodeId>,
) -> Result<()> {
    let sources = expand_names(ctx.fs.as_ref(), &line.sources)?;

    match special {
        SpecialTarget::Begin | SpecialTarget::End => {
            let id = ctx.graph.get_or_create(&line.targets[0]);
            ctx.graph.apply_operator(id, line.op)?;
            ctx.graph.node_mut(id).kind |= NodeType::SPECIAL | NodeType::NOTMAIN;
            link_sources(ctx, &[id], &sources);
            attach_commands(ctx, id, &line.commands);
        }
        SpecialTarget::Default => {
            let id = match ctx.default_node {
                Some(id) => id,
                None => {
                    let id = ctx.graph.new_internal(".DEFAULT");
                    ctx.default_node = Some(id);
                    id
                }
            };
            ctx.graph.node_mut(id).kind = NodeType::NOTMAIN | NodeType::TRANSFORM;
            link_sources(ctx, &[id], &sources);
            attach_commands(ctx, id, &line.commands);
        }
        SpecialTarget::Main => {
            main_override.extend(sources.iter().map(|s| ctx.graph.get_or_create(s)));
        }
        SpecialTarget::Order => {
            let ids: Vec<NodeId> = sources.iter().map(|s| ctx.graph.get_or_create(s)).collect();
            for pair in ids.windows(2) {
                ctx.graph.add_order(pair[0], pair[1]);
            }
        }
        SpecialTarget::Suffixes => {
            if sources.is_empty() {
                debug!("clearing suffixes");
                ctx.suffixes.clear_suffixes();
            }
            for name in &sources {
                ctx.suffixes.add_suffix(&mut ctx.graph, name);
            }
        }
        SpecialTarget::Null => {
            if let Some(name) = sources.last() {
                ctx.suffixes.set_null(name);
            }
        }
        SpecialTarget::Includes => {
            for name in &sources {
                ctx.suffixes.add_include(name);
            }
        }
        SpecialTarget::Libs => {
            for name in &sources {
                ctx.suffixes.add_library(name);
            }
        }
        SpecialTarget::Path(None) => {
            if sources.is_empty() {
                ctx.suffixes.set_global_path(Vec::new());
            }
            for dir in &sources {
                ctx.suffixes.add_global_dir(PathBuf::from(dir));
            }
        }
        SpecialTarget::Path(Some(suffix)) => {
            for dir in &sources {
                ctx.suffixes.add_suffix_dir(&suffix, PathBuf::from(dir));
            }
        }
        SpecialTarget::Ignore if sources.is_empty() => ctx.options.ignore_errors = true,
        SpecialTarget::Silent if sources.is_empty() => ctx.options.silent = true,
        SpecialTarget::NotParallel => ctx.options.jobs = 1,
        SpecialTarget::Phony
        | SpecialTarget::Precious
        | SpecialTarget::Ignore
        | SpecialTarget::Silent
        | SpecialTarget::NoPath => {
            let Some(attr) = NodeType::from_keyword(&line.targets[0]) else {
                return Ok(());
            };
            for name in &sources {
                let id = ctx.graph.get_or_create(name);
                ctx.graph.node_mut(id).kind |= attr;
            }
        }
    }
    Ok(())
}

fn apply_dependency(ctx: &mut BuildContext, line: &DependencyLine) -> Result<()> {
    let targets = expand_names(ctx.fs.as_ref(), &line.targets)?;

    // Node each target resolves to for this line (a cohort for repeated
    // `::`), and the named node whose eligibility as main target counts.
    let mut active = Vec::with_capacity(targets.len());
    let mut declared = Vec::with_capacity(targets.len());
    let mut transforms = Vec::new();

    for name in &targets {
        if ctx.suffixes.is_transform(name) {
            if let Some(rule) = ctx.suffixes.add_transform(&mut ctx.graph, name) {
                transforms.push(rule);
                active.push(rule);
            }
            continue;
        }
        let id = ctx.graph.get_or_create(name);
        mark_name_kind(ctx, id, name);
        let node = ctx.graph.apply_operator(id, line.op)?;
        active.push(node);
        declared.push(id);
    }

    let sources = expand_names(ctx.fs.as_ref(), &line.sources)?;
    link_sources(ctx, &active, &sources);

    for &id in &active {
        attach_commands(ctx, id, &line.commands);
    }
    for rule in transforms {
        ctx.suffixes.end_transform(&ctx.graph, rule);
    }

    if ctx.graph.main_targets().is_empty()
        && let Some(first) = declared
            .iter()
            .copied()
            .find(|id| ctx.graph.is_main_candidate(*id))
    {
        ctx.graph.offer_main(first);
    }
    Ok(())
}

/// Link `sources` below every node in `targets`, honouring attribute
/// keywords and `.WAIT` markers.
fn link_sources(ctx: &mut BuildContext, targets: &[NodeId], sources: &[String]) {
    for source in sources {
        if source == ".WAIT" {
            let wait = ctx.graph.new_wait_node();
            for &target in targets {
                ctx.graph.add_child(target, wait);
            }
            continue;
        }
        if let Some(attr) = NodeType::from_keyword(source) {
            for &target in targets {
                ctx.graph.node_mut(target).kind |= attr;
            }
            continue;
        }

        let id = ctx.graph.get_or_create(source);
        mark_name_kind(ctx, id, source);
        for &target in targets {
            ctx.graph.add_child(target, id);
        }
    }
}

/// Attributes implied by the shape of a name.
fn mark_name_kind(ctx: &mut BuildContext, id: NodeId, name: &str) {
    let node = ctx.graph.node_mut(id);
    if name.starts_with("-l") && name.len() > 2 {
        node.kind |= NodeType::LIB;
    } else if split_archive_member(name).is_some() {
        node.kind |= NodeType::ARCHV;
    }
}

fn attach_commands(ctx: &mut BuildContext, id: NodeId, commands: &[String]) {
    if commands.is_empty() {
        return;
    }
    let node = ctx.graph.node_mut(id);
    if !node.commands.is_empty() && !node.kind.contains(NodeType::TRANSFORM) {
        warn!(node = %node.display_name(), "duplicate script for target ignored");
        return;
    }
    node.commands = commands.to_vec();
}

/// Expand wildcards and `lib.a(m1 m2)` member lists in dependency names.
fn expand_names(fs: &dyn FileSystem, names: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        for name in split_member_list(name) {
            if has_wildcards(&name) && split_archive_member(&name).is_none() {
                out.extend(expand_wildcards(fs, &name)?);
            } else {
                out.push(name);
            }
        }
    }
    Ok(out)
}

fn split_member_list(name: &str) -> Vec<String> {
    match split_archive_member(name) {
        Some((archive, members)) if members.contains(char::is_whitespace) => members
            .split_whitespace()
            .map(|m| format!("{archive}({m})"))
            .collect(),
        _ => vec![name.to_string()],
    }
}

/// Names given on the command line, resolved to nodes.
pub fn resolve_goals(ctx: &mut BuildContext, names: &[String]) -> Vec<NodeId> {
    names
        .iter()
        .map(|name| {
            let id = ctx.graph.get_or_create(name);
            mark_name_kind(ctx, id, name);
            id
        })
        .collect()
}

