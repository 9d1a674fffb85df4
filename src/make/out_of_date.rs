// src/make/out_of_date.rs

//! Out-of-date classification of a single node.

use tracing::debug;

use crate::archive::LibraryState;
use crate::graph::{GraphStore, Node, NodeId, NodeType};
use crate::make::context::BuildContext;

/// Decide whether `id` must be remade. The first matching rule wins:
///
/// - `.USE`/`.USEBEFORE` nodes never are.
/// - Libraries are when missing, when the archive module says so, or when a
///   `::` library has no sources.
/// - `.JOIN` nodes are when one of their children was rebuilt.
/// - `!`, `.EXEC` and `.PHONY` nodes always are.
/// - Other nodes are when a child is younger, when they are missing and not
///   `.OPTIONAL`, or when they are `::` targets without sources.
/// - Finally, when a missing source without a recipe was made below them.
///
/// A node found current hands its mtime up to its parents' youngest-child
/// bookkeeping.
pub fn is_out_of_date(ctx: &mut BuildContext, id: NodeId) -> bool {
    let kind = ctx.graph.node(id).kind;
    if !kind.intersects(NodeType::JOIN | NodeType::USE | NodeType::USEBEFORE | NodeType::EXEC) {
        ctx.update_mtime(id, true);
    }

    let node = ctx.graph.node(id);
    let (stale, reason) = if kind.intersects(NodeType::USE | NodeType::USEBEFORE) {
        (false, ".USE node")
    } else if kind.contains(NodeType::LIB) && (!node.exists() || is_archive(ctx, node)) {
        let state = LibraryState {
            mtime: node.mtime,
            youngest_child: node.youngest_child.map(|y| ctx.graph.node(y).mtime),
            has_children: !node.children.is_empty(),
            is_target: node.is_target(),
            phony: kind.contains(NodeType::PHONY),
        };
        let stale = !node.exists()
            || ctx.archive.library_out_of_date(&state, ctx.now)
            || (node.youngest_child.is_none() && kind.contains(NodeType::DOUBLEDEP));
        (stale, "library")
    } else if kind.contains(NodeType::JOIN) {
        (node.flags.child_made, ".JOIN node")
    } else if kind.intersects(NodeType::FORCE | NodeType::EXEC | NodeType::PHONY) {
        (true, "force, .EXEC or .PHONY")
    } else if is_out_of_date_regular(&ctx.graph, node) {
        (true, "regular")
    } else {
        (node.flags.force, "made nonexistent source")
    };

    debug!(
        node = %node.display_name(),
        mtime = ?node.mtime,
        stale,
        reason,
        "out-of-date check"
    );

    if !stale {
        for parent in ctx.graph.node(id).parents.clone() {
            ctx.graph.update_youngest_child(parent, id);
        }
    }
    stale
}

fn is_out_of_date_regular(graph: &GraphStore, node: &Node) -> bool {
    let younger_child = node
        .youngest_child
        .is_some_and(|y| node.mtime < graph.node(y).mtime);
    let missing = !node.exists() && !node.kind.contains(NodeType::OPTIONAL);
    let empty_double = node.kind.contains(NodeType::DOUBLEDEP) && node.children.is_empty();

    younger_child || missing || empty_double
}

fn is_archive(ctx: &BuildContext, node: &Node) -> bool {
    let path = node.path.clone().unwrap_or_else(|| node.name.clone().into());
    ctx.archive.is_archive(ctx.fs.as_ref(), &path)
}
