// src/make/vars.rs

use std::collections::HashSet;

use crate::graph::{GraphStore, MadeState, NodeId, NodeType};
use crate::types::MTime;

/// Fill in `.ALLSRC` and `.OODATE` of `id` from its children, once.
///
/// A child goes into `.OODATE` if it is newer than the node, or if it was
/// built during this run. For `.JOIN` nodes only rebuilt children count,
/// and `.TARGET` becomes the full source list.
pub fn bind_local_vars(graph: &mut GraphStore, id: NodeId, now: MTime) {
    let node = graph.node(id);
    if node.flags.done_allsrc {
        return;
    }
    let parent_mtime = node.mtime;
    let parent_join = node.kind.contains(NodeType::JOIN);

    let mut seen = HashSet::new();
    let mut allsrc = Vec::new();
    let mut oodate = Vec::new();

    for &child in &node.children {
        if !seen.insert(child) {
            continue;
        }
        let c = graph.node(child);
        if c.kind.intersects(
            NodeType::EXEC
                | NodeType::USE
                | NodeType::USEBEFORE
                | NodeType::INVISIBLE
                | NodeType::WAIT,
        ) {
            continue;
        }

        let name = if c.kind.contains(NodeType::ARCHV) {
            c.vars.member.clone().unwrap_or_else(|| c.name.clone())
        } else {
            c.path_or_name()
        };
        if c.kind.contains(NodeType::JOIN) {
            allsrc.extend(c.vars.allsrc.iter().cloned());
        } else {
            allsrc.push(name.clone());
        }

        let rebuilt = c.made == MadeState::Made;
        if parent_join {
            if rebuilt {
                oodate.push(name);
            }
        } else if parent_mtime < c.mtime || (c.mtime >= Some(now) && rebuilt) {
            oodate.push(name);
        }
    }

    let node = graph.node_mut(id);
    if node.vars.target.is_none() {
        node.vars.target = Some(node.path_or_name());
    }
    if parent_join {
        node.vars.target = Some(allsrc.join(" "));
    }
    node.vars.allsrc = allsrc;
    node.vars.oodate = oodate;
    node.flags.done_allsrc = true;
}
