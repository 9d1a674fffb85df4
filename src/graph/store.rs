// src/graph/store.rs

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::errors::{MakeError, Result};
use crate::graph::node::{Node, NodeId, NodeType};
use crate::types::DependencyOp;

/// Arena owning every node ever referenced during one build invocation.
///
/// Nodes are addressed by [`NodeId`]; edges are id lists, so the synthetic
/// `.ORDER`/`.WAIT` edges may close cycles without any ownership issue.
/// Named nodes are created exactly once per name. Internal nodes (cohorts,
/// `.WAIT_n` barriers, transformation rules, the synthetic `.MAIN` root) are
/// not reachable through [`GraphStore::find`].
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    by_name: HashMap<String, NodeId>,
    main: Vec<NodeId>,
    wait_counter: u32,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a named node.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Return the node called `name`, creating it on first reference.
    pub fn get_or_create(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = self.push(Node::new(name));
        self.by_name.insert(name.to_string(), id);
        trace!(node = %name, %id, "created node");
        id
    }

    /// Create a node that is not registered under its name.
    pub fn new_internal(&mut self, name: &str) -> NodeId {
        self.push(Node::new(name))
    }

    /// Create the next `.WAIT_n` barrier node.
    pub fn new_wait_node(&mut self) -> NodeId {
        self.wait_counter += 1;
        let name = format!(".WAIT_{}", self.wait_counter);
        let id = self.new_internal(&name);
        self.node_mut(id).kind =
            NodeType::WAIT | NodeType::PHONY | NodeType::DEPENDS | NodeType::NOTMAIN;
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// All node ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Link `child` below `parent`.
    ///
    /// Returns `false` if the edge already existed. The parent's unmade
    /// count only covers children that are not already done, so linking
    /// during a later run keeps the count consistent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes[parent.0].children.contains(&child) {
            return false;
        }
        let child_done = self.nodes[child.0].made.is_done();
        let p = &mut self.nodes[parent.0];
        p.children.push(child);
        if !child_done {
            p.unmade += 1;
        }
        self.nodes[child.0].parents.push(parent);
        true
    }

    /// Remove the edge `parent -> child` if present.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let child_done = self.nodes[child.0].made.is_done();
        let p = &mut self.nodes[parent.0];
        let before = p.children.len();
        p.children.retain(|c| *c != child);
        if p.children.len() == before {
            return;
        }
        if !child_done {
            p.unmade = p.unmade.saturating_sub(1);
        }
        self.nodes[child.0].parents.retain(|q| *q != parent);
    }

    /// Record that `pred` must be done before `succ` may be requested.
    pub fn add_order(&mut self, pred: NodeId, succ: NodeId) {
        if pred == succ || self.nodes[pred.0].order_succ.contains(&succ) {
            return;
        }
        self.nodes[pred.0].order_succ.push(succ);
        self.nodes[succ.0].order_pred.push(pred);
    }

    /// Apply a dependency operator to `name` and return the node that the
    /// rest of the dependency line should attach to.
    ///
    /// A repeated `::` creates a new cohort of the first ("centurion")
    /// instance; every other name keeps resolving to the centurion, so the
    /// parents of the whole cohort group live in one list.
    pub fn declare_target(&mut self, name: &str, op: DependencyOp) -> Result<NodeId> {
        let id = self.get_or_create(name);
        self.apply_operator(id, op)
    }

    pub fn apply_operator(&mut self, id: NodeId, op: DependencyOp) -> Result<NodeId> {
        let op_bits = NodeType::from_op(op);
        let existing = self.nodes[id.0].kind & NodeType::OPMASK;

        if !existing.is_empty() && existing != op_bits {
            return Err(MakeError::InconsistentOperator(self.nodes[id.0].name.clone()));
        }

        if op == DependencyOp::DoubleDep && existing == NodeType::DOUBLEDEP {
            let name = self.nodes[id.0].name.clone();
            let cohort = self.new_internal(&name);

            let centurion = &mut self.nodes[id.0];
            centurion.cohorts.push(cohort);
            centurion.unmade_cohorts += 1;
            let num = centurion.cohorts.len();

            let c = &mut self.nodes[cohort.0];
            c.kind = NodeType::DOUBLEDEP | NodeType::INVISIBLE;
            c.centurion = Some(id);
            c.cohort_num = format!("#{num}");
            debug!(node = %name, cohort = num, ":: created new cohort");
            return Ok(cohort);
        }

        self.nodes[id.0].kind |= op_bits;
        Ok(id)
    }

    /// Expand a `.USE`/`.USEBEFORE` node or a transformation rule into
    /// `target`: copy the recipe, inherit children and merge attributes.
    pub fn apply_use(&mut self, use_node: NodeId, target: NodeId) {
        let (use_kind, commands, children) = {
            let u = &self.nodes[use_node.0];
            (u.kind, u.commands.clone(), u.children.clone())
        };

        let t = &mut self.nodes[target.0];
        if use_kind.intersects(NodeType::USE | NodeType::USEBEFORE) || t.commands.is_empty() {
            if use_kind.contains(NodeType::USEBEFORE) {
                let mut merged = commands;
                merged.append(&mut t.commands);
                t.commands = merged;
            } else {
                t.commands.extend(commands);
            }
        }
        t.kind |= use_kind
            & !(NodeType::OPMASK
                | NodeType::USE
                | NodeType::USEBEFORE
                | NodeType::TRANSFORM
                | NodeType::DEPS_FOUND);

        for child in children {
            self.add_child(target, child);
        }
    }

    /// Remember `child` as the youngest child of `parent` if it is newer.
    pub fn update_youngest_child(&mut self, parent: NodeId, child: NodeId) {
        let child_mtime = self.nodes[child.0].mtime;
        let replace = match self.nodes[parent.0].youngest_child {
            None => true,
            Some(current) => child_mtime > self.nodes[current.0].mtime,
        };
        if replace {
            self.nodes[parent.0].youngest_child = Some(child);
        }
    }

    /// Default goals, in declaration order.
    pub fn main_targets(&self) -> &[NodeId] {
        &self.main
    }

    pub fn set_main(&mut self, targets: Vec<NodeId>) {
        self.main = targets;
    }

    /// Whether a target may become the default goal.
    pub fn is_main_candidate(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        node.is_target()
            && !node.kind.intersects(
                NodeType::NOTMAIN
                    | NodeType::USE
                    | NodeType::USEBEFORE
                    | NodeType::EXEC
                    | NodeType::TRANSFORM
                    | NodeType::SPECIAL,
            )
    }

    /// Make `id` the main target unless one was already chosen.
    pub fn offer_main(&mut self, id: NodeId) {
        if self.main.is_empty() {
            debug!(node = %self.nodes[id.0].name, "main target");
            self.main.push(id);
        }
    }

    pub fn forget_main(&mut self, id: NodeId) {
        self.main.retain(|m| *m != id);
    }
}
