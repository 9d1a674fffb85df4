// src/suffix/candidate.rs

//! Scratch records of one implicit source search.
//!
//! Every hypothesis lives in a [`CandidateArena`] owned by a single
//! resolution call. Candidates point at their parent by index, so the
//! winning chain can be walked back to the target while the losers stay
//! allocated; everything is dropped together when the arena goes out of
//! scope.

use crate::graph::NodeId;
use crate::suffix::SuffixId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateId(usize);

/// A hypothesized source (or, at the root, the target itself).
#[derive(Debug, Clone)]
pub struct Candidate {
    /// File name this candidate stands for.
    pub file: String,
    /// Name of the target with its suffix removed.
    pub prefix: String,
    /// Suffix that produced `file`.
    pub suffix: SuffixId,
    /// Candidate this one would be transformed into; `None` at the root.
    pub parent: Option<CandidateId>,
    /// Graph node behind `file`, once known.
    pub node: Option<NodeId>,
    /// Number of candidates derived from this one.
    pub pending_children: usize,
}

#[derive(Debug, Default)]
pub struct CandidateArena {
    items: Vec<Candidate>,
}

impl CandidateArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        file: String,
        prefix: String,
        suffix: SuffixId,
        parent: Option<CandidateId>,
        node: Option<NodeId>,
    ) -> CandidateId {
        let id = CandidateId(self.items.len());
        if let Some(p) = parent {
            self.items[p.0].pending_children += 1;
        }
        self.items.push(Candidate {
            file,
            prefix,
            suffix,
            parent,
            node,
            pending_children: 0,
        });
        id
    }

    pub fn get(&self, id: CandidateId) -> &Candidate {
        &self.items[id.0]
    }

    pub fn get_mut(&mut self, id: CandidateId) -> &mut Candidate {
        &mut self.items[id.0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Walk parent links from `id` up to the root.
    pub fn root_of(&self, id: CandidateId) -> CandidateId {
        let mut cur = id;
        while let Some(parent) = self.items[cur.0].parent {
            cur = parent;
        }
        cur
    }

    /// Candidates nothing was derived from.
    pub fn leaf_count(&self) -> usize {
        self.items
            .iter()
            .filter(|c| c.pending_children == 0)
            .count()
    }
}
