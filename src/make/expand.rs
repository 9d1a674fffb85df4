// src/make/expand.rs

//! Graph preparation passes run before scheduling starts.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::graph::{GraphStore, NodeId, NodeType};
use crate::make::context::BuildContext;

/// Mark everything reachable from `goals` for remaking.
///
/// On the way, refresh mtimes, fold `.USE` sources into their parents and
/// run the implicit source resolver, which may add further children to
/// examine.
pub fn expand_use(ctx: &mut BuildContext, goals: &[NodeId]) {
    let mut examine: VecDeque<NodeId> = goals.iter().copied().collect();

    while let Some(id) = examine.pop_front() {
        if ctx.graph.node(id).flags.remake {
            continue;
        }
        ctx.graph.node_mut(id).flags.remake = true;
        trace!(node = %ctx.graph.node(id).display_name(), "examining");

        let node = ctx.graph.node(id);
        if node.kind.contains(NodeType::DOUBLEDEP) {
            for cohort in node.cohorts.iter().rev() {
                examine.push_front(*cohort);
            }
        }

        ctx.update_mtime(id, false);
        let target = ctx.graph.node(id).path_or_name();
        ctx.graph.node_mut(id).vars.target = Some(target);

        handle_use_nodes(&mut ctx.graph, id);

        if ctx.graph.node(id).kind.contains(NodeType::MADE) {
            pretend_all_children_are_made(ctx, id);
            let node = ctx.graph.node(id);
            if node.unmade != 0 {
                warn!(node = %node.display_name(), unmade = node.unmade, "still has unmade children");
            }
        } else {
            ctx.find_deps(id);
        }

        let node = ctx.graph.node(id);
        if node.unmade != 0 {
            for &child in &node.children {
                let c = ctx.graph.node(child);
                if !c.flags.remake && !c.kind.intersects(NodeType::USE | NodeType::USEBEFORE) {
                    examine.push_back(child);
                }
            }
        }
    }
}

/// Expand every `.USE`/`.USEBEFORE` child of `id` into `id` and drop the
/// edge.
fn handle_use_nodes(graph: &mut GraphStore, id: NodeId) {
    let mut i = 0;
    while i < graph.node(id).children.len() {
        let child = graph.node(id).children[i];
        if graph
            .node(child)
            .kind
            .intersects(NodeType::USE | NodeType::USEBEFORE)
        {
            debug!(node = %graph.name(id), using = %graph.name(child), "applying .USE");
            graph.apply_use(child, id);
            graph.remove_child(id, child);
            continue;
        }
        i += 1;
    }
}

/// A `.MADE` node is taken as built: its children only contribute their
/// mtimes.
fn pretend_all_children_are_made(ctx: &mut BuildContext, id: NodeId) {
    for child in ctx.graph.node(id).children.clone() {
        ctx.update_mtime(child, false);
        ctx.graph.update_youngest_child(id, child);
    }
    ctx.graph.node_mut(id).unmade = 0;
}

/// Hang `goals` below a synthetic `.MAIN` root and turn every `.WAIT`
/// marker into a barrier.
///
/// Each `.WAIT_n` node depends on the siblings before it (back to the
/// previous marker, which it also depends on) and is an order predecessor
/// of every sibling after it.
pub fn process_wait(graph: &mut GraphStore, goals: &[NodeId]) -> NodeId {
    let root = graph.new_internal(".MAIN");
    {
        let node = graph.node_mut(root);
        node.kind = NodeType::PHONY | NodeType::DEPENDS;
        node.flags.remake = true;
    }
    for &goal in goals {
        graph.add_child(root, goal);
    }

    let mut examine = VecDeque::from([root]);
    while let Some(id) = examine.pop_front() {
        if graph.node(id).flags.done_wait {
            continue;
        }
        graph.node_mut(id).flags.done_wait = true;

        let node = graph.node(id);
        if node.kind.contains(NodeType::DOUBLEDEP) {
            for cohort in node.cohorts.iter().rev() {
                examine.push_front(*cohort);
            }
        }

        let children = graph.node(id).children.clone();
        let mut since = 0;
        for (i, &child) in children.iter().enumerate() {
            if !graph.node(child).kind.contains(NodeType::WAIT) {
                examine.push_back(child);
                continue;
            }
            for &before in &children[since..i] {
                graph.add_child(child, before);
            }
            for &after in &children[i + 1..] {
                graph.add_order(child, after);
            }
            trace!(
                parent = %graph.name(id),
                wait = %graph.name(child),
                before = i - since,
                "placed .WAIT barrier"
            );
            since = i;
        }
    }
    root
}
