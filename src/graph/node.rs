// src/graph/node.rs

//! Build-graph vertices: identity, attributes and per-run state.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::path::PathBuf;

use crate::graph::vars::LocalVars;
use crate::suffix::SuffixId;
use crate::types::{DependencyOp, MTime};

/// Stable handle of a node inside a [`GraphStore`](super::GraphStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attribute bitset of a node.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct NodeType(u32);

impl NodeType {
    pub const NONE: NodeType = NodeType(0);
    /// `:` operator.
    pub const DEPENDS: NodeType = NodeType(1 << 0);
    /// `!` operator.
    pub const FORCE: NodeType = NodeType(1 << 1);
    /// `::` operator.
    pub const DOUBLEDEP: NodeType = NodeType(1 << 2);
    pub const OPMASK: NodeType = NodeType(1 | (1 << 1) | (1 << 2));

    pub const OPTIONAL: NodeType = NodeType(1 << 3);
    pub const USE: NodeType = NodeType(1 << 4);
    pub const EXEC: NodeType = NodeType(1 << 5);
    pub const IGNORE: NodeType = NodeType(1 << 6);
    pub const PRECIOUS: NodeType = NodeType(1 << 7);
    pub const SILENT: NodeType = NodeType(1 << 8);
    pub const MAKE: NodeType = NodeType(1 << 9);
    pub const JOIN: NodeType = NodeType(1 << 10);
    pub const MADE: NodeType = NodeType(1 << 11);
    pub const SPECIAL: NodeType = NodeType(1 << 12);
    pub const USEBEFORE: NodeType = NodeType(1 << 13);
    pub const INVISIBLE: NodeType = NodeType(1 << 14);
    pub const NOTMAIN: NodeType = NodeType(1 << 15);
    pub const PHONY: NodeType = NodeType(1 << 16);
    pub const NOPATH: NodeType = NodeType(1 << 17);
    /// Synthetic `.WAIT_n` barrier.
    pub const WAIT: NodeType = NodeType(1 << 18);
    /// `archive(member)` node.
    pub const ARCHV: NodeType = NodeType(1 << 19);
    pub const MEMBER: NodeType = NodeType(1 << 20);
    /// `-lname` library node.
    pub const LIB: NodeType = NodeType(1 << 21);
    /// Suffix transformation rule such as `.c.o`.
    pub const TRANSFORM: NodeType = NodeType(1 << 22);
    /// Implicit sources have already been searched for.
    pub const DEPS_FOUND: NodeType = NodeType(1 << 23);

    const NAMES: &'static [(NodeType, &'static str)] = &[
        (NodeType::DEPENDS, "DEPENDS"),
        (NodeType::FORCE, "FORCE"),
        (NodeType::DOUBLEDEP, "DOUBLEDEP"),
        (NodeType::OPTIONAL, "OPTIONAL"),
        (NodeType::USE, "USE"),
        (NodeType::EXEC, "EXEC"),
        (NodeType::IGNORE, "IGNORE"),
        (NodeType::PRECIOUS, "PRECIOUS"),
        (NodeType::SILENT, "SILENT"),
        (NodeType::MAKE, "MAKE"),
        (NodeType::JOIN, "JOIN"),
        (NodeType::MADE, "MADE"),
        (NodeType::SPECIAL, "SPECIAL"),
        (NodeType::USEBEFORE, "USEBEFORE"),
        (NodeType::INVISIBLE, "INVISIBLE"),
        (NodeType::NOTMAIN, "NOTMAIN"),
        (NodeType::PHONY, "PHONY"),
        (NodeType::NOPATH, "NOPATH"),
        (NodeType::WAIT, "WAIT"),
        (NodeType::ARCHV, "ARCHV"),
        (NodeType::MEMBER, "MEMBER"),
        (NodeType::LIB, "LIB"),
        (NodeType::TRANSFORM, "TRANSFORM"),
        (NodeType::DEPS_FOUND, "DEPS_FOUND"),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: NodeType) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(self, other: NodeType) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: NodeType) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: NodeType) {
        self.0 &= !other.0;
    }

    /// Attribute named by a source keyword on a dependency line
    /// (`prog: .PHONY`) or by the special target of the same name.
    pub fn from_keyword(word: &str) -> Option<NodeType> {
        let ty = match word {
            ".EXEC" => NodeType::EXEC,
            ".IGNORE" => NodeType::IGNORE,
            ".INVISIBLE" => NodeType::INVISIBLE,
            ".JOIN" => NodeType::JOIN,
            ".MADE" => NodeType::MADE,
            ".MAKE" => NodeType::MAKE,
            ".NOPATH" => NodeType::NOPATH,
            ".NOTMAIN" => NodeType::NOTMAIN,
            ".OPTIONAL" => NodeType::OPTIONAL,
            ".PHONY" => NodeType::PHONY,
            ".PRECIOUS" => NodeType::PRECIOUS,
            ".SILENT" => NodeType::SILENT,
            ".USE" => NodeType::USE,
            ".USEBEFORE" => NodeType::USEBEFORE,
            _ => return None,
        };
        Some(ty)
    }

    pub fn from_op(op: DependencyOp) -> NodeType {
        match op {
            DependencyOp::Depends => NodeType::DEPENDS,
            DependencyOp::Force => NodeType::FORCE,
            DependencyOp::DoubleDep => NodeType::DOUBLEDEP,
        }
    }
}

impl BitOr for NodeType {
    type Output = NodeType;

    fn bitor(self, rhs: NodeType) -> NodeType {
        NodeType(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeType {
    fn bitor_assign(&mut self, rhs: NodeType) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for NodeType {
    type Output = NodeType;

    fn bitand(self, rhs: NodeType) -> NodeType {
        NodeType(self.0 & rhs.0)
    }
}

impl Not for NodeType {
    type Output = NodeType;

    fn not(self) -> NodeType {
        NodeType(!self.0)
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Per-node state of the scheduler.
///
/// The ordering of the variants is significant: everything from `Made`
/// onwards is terminal, and everything after `Deferred` is "ready"
/// (already queued or past the queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MadeState {
    /// Not yet looked at in this run.
    #[default]
    Unmade,
    /// Waiting for children or `.ORDER` predecessors.
    Deferred,
    /// On the frontier queue.
    Requested,
    /// Being evaluated or handed to the job runner.
    BeingMade,
    /// Recipe ran successfully.
    Made,
    /// Found current; nothing ran.
    UpToDate,
    /// Recipe failed.
    Error,
    /// Not remade because something below it failed.
    Aborted,
}

impl MadeState {
    pub fn is_done(self) -> bool {
        self >= MadeState::Made
    }

    pub fn is_ready(self) -> bool {
        self > MadeState::Deferred
    }

    pub fn is_failure(self) -> bool {
        matches!(self, MadeState::Error | MadeState::Aborted)
    }
}

/// Bookkeeping flags that are not attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Reachable from the goals of the current run.
    pub remake: bool,
    /// At least one child was actually rebuilt (drives `.JOIN`).
    pub child_made: bool,
    /// A nonexistent child without commands was "made" underneath.
    pub force: bool,
    /// `.WAIT` processing already visited this child list.
    pub done_wait: bool,
    /// Requested by `.ORDER` successor scheduling.
    pub done_order: bool,
    /// `.ALLSRC`/`.OODATE` already computed.
    pub done_allsrc: bool,
    /// A cycle through this node was already reported.
    pub done_cycle: bool,
}

/// A build-graph vertex.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// `#n` for the n-th extra `::` cohort, empty otherwise.
    pub cohort_num: String,
    pub kind: NodeType,
    pub flags: NodeFlags,
    pub made: MadeState,
    /// Children not yet made in this run.
    pub unmade: usize,
    /// Cohorts of a `::` centurion not yet made.
    pub unmade_cohorts: usize,
    pub mtime: Option<MTime>,
    pub youngest_child: Option<NodeId>,
    /// Location found through the search path, if any.
    pub path: Option<PathBuf>,
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,
    /// Targets this node was implicitly transformed into.
    pub implicit_parents: Vec<NodeId>,
    pub cohorts: Vec<NodeId>,
    pub centurion: Option<NodeId>,
    pub order_pred: Vec<NodeId>,
    pub order_succ: Vec<NodeId>,
    pub suffix: Option<SuffixId>,
    pub commands: Vec<String>,
    pub vars: LocalVars,
    pub checked_seqno: u64,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cohort_num: String::new(),
            kind: NodeType::NONE,
            flags: NodeFlags::default(),
            made: MadeState::Unmade,
            unmade: 0,
            unmade_cohorts: 0,
            mtime: None,
            youngest_child: None,
            path: None,
            children: Vec::new(),
            parents: Vec::new(),
            implicit_parents: Vec::new(),
            cohorts: Vec::new(),
            centurion: None,
            order_pred: Vec::new(),
            order_succ: Vec::new(),
            suffix: None,
            commands: Vec::new(),
            vars: LocalVars::default(),
            checked_seqno: 0,
        }
    }

    /// Name plus cohort number, for diagnostics.
    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, self.cohort_num)
    }

    /// Appeared on the left of a dependency operator.
    pub fn is_target(&self) -> bool {
        self.kind.intersects(NodeType::OPMASK)
    }

    pub fn exists(&self) -> bool {
        self.mtime.is_some()
    }

    /// Path if one was found through the search path, the name otherwise.
    pub fn path_or_name(&self) -> String {
        match &self.path {
            Some(p) => p.to_string_lossy().into_owned(),
            None => self.name.clone(),
        }
    }
}
