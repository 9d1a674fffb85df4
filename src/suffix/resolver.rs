// src/suffix/resolver.rs

//! Implicit source search.
//!
//! For a node without explicit sources, the resolver hypothesizes source
//! files by walking the transformation graph breadth-first from every suffix
//! the node's name ends in. The first hypothesis that names an existing node
//! or a file on the search path wins, so the chain of rules applied is a
//! shortest one; ties go to the suffix declared first. The winning chain is
//! then committed to the graph, one transformation rule per link.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::archive::split_archive_member;
use crate::fs::FileSystem;
use crate::graph::{GraphStore, NodeId, NodeType};
use crate::suffix::candidate::{CandidateArena, CandidateId};
use crate::suffix::{SuffixId, SuffixRegistry};

/// One resolution pass over the graph.
///
/// Borrows the graph mutably (resolution creates nodes and edges) and the
/// registry immutably (resolution never changes the rule graph).
pub struct Resolver<'a> {
    graph: &'a mut GraphStore,
    suffixes: &'a SuffixRegistry,
    fs: &'a dyn FileSystem,
}

/// Candidates still to be examined, plus every file name already queued.
struct Frontier {
    queue: VecDeque<CandidateId>,
    seen: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        graph: &'a mut GraphStore,
        suffixes: &'a SuffixRegistry,
        fs: &'a dyn FileSystem,
    ) -> Self {
        Self {
            graph,
            suffixes,
            fs,
        }
    }

    /// Find the implicit sources of `id`, at most once per node.
    pub fn find_deps(&mut self, id: NodeId) {
        let node = self.graph.node(id);
        if node.kind.contains(NodeType::DEPS_FOUND) {
            return;
        }
        let kind = node.kind;
        let target = node.path_or_name();

        let node = self.graph.node_mut(id);
        node.kind.insert(NodeType::DEPS_FOUND);
        node.vars.target = Some(target);

        trace!(node = %self.graph.name(id), "finding implicit sources");

        if kind.contains(NodeType::ARCHV) {
            self.find_deps_archive(id);
        } else if kind.contains(NodeType::LIB) {
            self.find_deps_lib(id);
        } else {
            self.find_deps_regular(id);
        }
    }

    fn find_deps_regular(&mut self, id: NodeId) {
        let name = self.graph.name(id).to_string();
        let mut arena = CandidateArena::new();
        let mut frontier = Frontier {
            queue: VecDeque::new(),
            seen: HashSet::from([name.clone()]),
        };
        let mut roots = Vec::new();
        let mut bottom = None;

        if !self.graph.node(id).kind.contains(NodeType::PHONY) {
            for suffix in self.suffixes.matching_suffixes(&name) {
                let prefix = name[..name.len() - self.suffixes.name(suffix).len()].to_string();
                let root = arena.push(name.clone(), prefix, suffix, None, Some(id));
                roots.push(root);
                self.expand(&mut arena, root, &mut frontier);
            }

            if roots.is_empty() {
                let null = self.suffixes.null_suffix();
                let root = arena.push(name.clone(), name.clone(), null, None, Some(id));
                roots.push(root);
                if self.graph.node(id).commands.is_empty() {
                    self.expand(&mut arena, root, &mut frontier);
                } else {
                    trace!(node = %name, "has commands; not adding suffix rules");
                }
            }

            bottom = self.find_them(&mut arena, &mut frontier);
        }

        let targ = match bottom {
            Some(b) => Some(arena.root_of(b)),
            None => roots.first().copied(),
        };

        let prefix = match targ {
            Some(t) => arena.get(t).prefix.clone(),
            None => name.clone(),
        };
        let target_var = self.graph.node(id).path_or_name();
        let vars = &mut self.graph.node_mut(id).vars;
        vars.target = Some(target_var);
        vars.prefix = Some(prefix);

        let Some(targ) = targ else {
            trace!(node = %name, "no valid suffix");
            self.probe_path(id, None);
            return;
        };

        let targ_suffix = arena.get(targ).suffix;
        if self.suffixes.get(targ_suffix).flags.library {
            self.graph.node_mut(id).kind.insert(NodeType::LIB);
        }

        if !self.graph.node(id).children.is_empty()
            && let Some(src) = self.find_cmds(&mut arena, targ)
        {
            debug!(node = %name, source = %arena.get(src).file, "source implies transformation");
            bottom = Some(src);
        }

        let Some(bottom) = bottom else {
            trace!(node = %name, "no transformation chain found");
            self.probe_path(id, Some(targ_suffix));
            return;
        };

        self.materialize(&mut arena, bottom, id);
        debug!(
            node = %name,
            candidates = arena.len(),
            leaves = arena.leaf_count(),
            "implicit source search finished"
        );
    }

    /// Queue every hypothesis derivable from `cand` in one rule step.
    fn expand(&self, arena: &mut CandidateArena, cand: CandidateId, frontier: &mut Frontier) {
        let (prefix, suffix) = {
            let c = arena.get(cand);
            (c.prefix.clone(), c.suffix)
        };

        for &child in &self.suffixes.get(suffix).children {
            let child_suffix = self.suffixes.get(child);

            if child_suffix.flags.null && !child_suffix.name.is_empty() {
                self.push_candidate(arena, frontier, prefix.clone(), &prefix, child, cand);
            }
            let file = format!("{prefix}{}", child_suffix.name);
            self.push_candidate(arena, frontier, file, &prefix, child, cand);
        }
    }

    fn push_candidate(
        &self,
        arena: &mut CandidateArena,
        frontier: &mut Frontier,
        file: String,
        prefix: &str,
        suffix: SuffixId,
        parent: CandidateId,
    ) {
        if !frontier.seen.insert(file.clone()) {
            return;
        }
        trace!(file = %file, suffix = %self.suffixes.name(suffix), "adding candidate");
        let id = arena.push(file, prefix.to_string(), suffix, Some(parent), None);
        frontier.queue.push_back(id);
    }

    /// Breadth-first search for a candidate that exists as a node or a file.
    fn find_them(
        &mut self,
        arena: &mut CandidateArena,
        frontier: &mut Frontier,
    ) -> Option<CandidateId> {
        while let Some(cand) = frontier.queue.pop_front() {
            let (file, suffix) = {
                let c = arena.get(cand);
                (c.file.clone(), c.suffix)
            };

            if let Some(node) = self.graph.find(&file) {
                trace!(file = %file, "candidate is an existing node");
                arena.get_mut(cand).node = Some(node);
                return Some(cand);
            }

            let dirs = self.suffixes.search_path(suffix);
            if let Some(path) = self.fs.find_file(&file, &dirs) {
                trace!(file = %file, path = %path.display(), "candidate found on search path");
                return Some(cand);
            }

            self.expand(arena, cand, frontier);
        }
        None
    }

    /// Look for an explicit child of `targ` that some rule turns into the
    /// target's suffix, e.g. `prog.o: prog.c` with a `.c.o` rule.
    fn find_cmds(&self, arena: &mut CandidateArena, targ: CandidateId) -> Option<CandidateId> {
        let (tnode, prefix, tsuffix) = {
            let t = arena.get(targ);
            (t.node?, t.prefix.clone(), t.suffix)
        };
        let allowed = &self.suffixes.get(tsuffix).children;

        for &child in &self.graph.node(tnode).children {
            let cname = self.graph.name(child);
            let base = cname.rsplit('/').next().unwrap_or(cname);
            let Some(rest) = base.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let Some(suffix) = self.suffixes.find(rest) else {
                continue;
            };
            if !allowed.contains(&suffix) {
                continue;
            }
            return Some(arena.push(
                cname.to_string(),
                prefix.clone(),
                suffix,
                Some(targ),
                Some(child),
            ));
        }
        None
    }

    fn candidate_node(&mut self, arena: &mut CandidateArena, cand: CandidateId) -> NodeId {
        if let Some(node) = arena.get(cand).node {
            return node;
        }
        let node = self.graph.get_or_create(&arena.get(cand).file);
        arena.get_mut(cand).node = Some(node);
        node
    }

    /// Commit the chain from `bottom` up to the target under resolution.
    fn materialize(&mut self, arena: &mut CandidateArena, bottom: CandidateId, target: NodeId) {
        let mut src = bottom;

        while let Some(targ) = arena.get(src).parent {
            let src_node = self.candidate_node(arena, src);
            let src_suffix = arena.get(src).suffix;
            self.graph.node_mut(src_node).suffix = Some(src_suffix);

            let targ_node = self.candidate_node(arena, targ);
            let targ_suffix = arena.get(targ).suffix;
            self.apply_transform(targ_node, src_node, targ_suffix, src_suffix);

            if targ_node != target {
                let prefix = arena.get(targ).prefix.clone();
                let node = self.graph.node_mut(targ_node);
                node.kind.insert(NodeType::DEPS_FOUND);
                node.vars.prefix = Some(prefix);
                node.vars.target = Some(node.name.clone());
            }
            src = targ;
        }

        self.graph.node_mut(target).suffix = Some(arena.get(src).suffix);
    }

    /// Link `source` below `target` and apply the rule between their
    /// suffixes. Returns `false` if no rule exists.
    fn apply_transform(
        &mut self,
        target: NodeId,
        source: NodeId,
        target_suffix: SuffixId,
        source_suffix: SuffixId,
    ) -> bool {
        self.graph.add_child(target, source);

        let Some(rule) = self.suffixes.transform_between(source_suffix, target_suffix) else {
            return false;
        };

        debug!(
            node = %self.graph.name(target),
            source = %self.graph.name(source),
            rule = %self.graph.name(rule),
            "applying transformation"
        );
        self.graph.apply_use(rule, target);

        let implicit = &mut self.graph.node_mut(source).implicit_parents;
        if !implicit.contains(&target) {
            implicit.push(target);
        }
        true
    }

    /// No chain found: look the node itself up on the search path.
    fn probe_path(&mut self, id: NodeId, suffix: Option<SuffixId>) {
        let node = self.graph.node(id);
        if node.kind.intersects(NodeType::PHONY | NodeType::NOPATH) {
            return;
        }
        self.graph.node_mut(id).suffix = suffix;

        let node = self.graph.node(id);
        let dirs: Vec<PathBuf> = match suffix {
            Some(s) => self.suffixes.search_path(s),
            None => self.suffixes.global_path().to_vec(),
        };
        let Some(path) = self.fs.find_file(&node.name, &dirs) else {
            return;
        };

        let shown = path.to_string_lossy().into_owned();
        let prefix = match suffix {
            Some(s) => {
                let sname = self.suffixes.name(s);
                shown.strip_suffix(sname).unwrap_or(&shown).to_string()
            }
            None => path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| shown.clone()),
        };

        trace!(node = %node.name, path = %shown, "found on search path");
        let node = self.graph.node_mut(id);
        node.vars.target = Some(shown);
        node.vars.prefix = Some(prefix);
        node.suffix = suffix;
        node.path = Some(path);
    }

    /// `-lname`: look for `libname<libsuffix>` on the library search path.
    fn find_deps_lib(&mut self, id: NodeId) {
        let name = self.graph.name(id).to_string();

        match self.suffixes.library_suffix() {
            Some(suffix) => {
                let base = name.strip_prefix("-l").unwrap_or(&name);
                let lib_name = format!("lib{base}{}", self.suffixes.name(suffix));
                let dirs = self.suffixes.search_path(suffix);
                let path = self.fs.find_file(&lib_name, &dirs);
                debug!(node = %name, library = %lib_name, found = path.is_some(), "library lookup");

                let node = self.graph.node_mut(id);
                node.suffix = Some(suffix);
                node.vars.target = Some(
                    path.as_ref()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_else(|| name.clone()),
                );
                node.path = path;
            }
            None => {
                let node = self.graph.node_mut(id);
                node.suffix = None;
                node.vars.target = Some(name);
            }
        }
        self.graph.node_mut(id).vars.prefix = Some(String::new());
    }

    /// `archive(member)`: resolve the member, then link it to the archive.
    fn find_deps_archive(&mut self, id: NodeId) {
        let name = self.graph.name(id).to_string();
        let Some((archive, member)) = split_archive_member(&name) else {
            self.find_deps_regular(id);
            return;
        };

        let mem = self.graph.get_or_create(member);
        self.find_deps(mem);
        self.graph.add_child(id, mem);

        let (mem_prefix, mem_suffix) = {
            let m = self.graph.node(mem);
            (m.vars.prefix.clone(), m.suffix)
        };

        {
            let node = self.graph.node_mut(id);
            node.vars.prefix = mem_prefix;
            node.vars.member = Some(member.to_string());
            node.vars.archive = Some(archive.to_string());
            node.vars.target = Some(name.clone());
        }

        if let Some(mem_suffix) = mem_suffix {
            let archive_suffix = self
                .suffixes
                .matching_suffixes(archive)
                .first()
                .copied()
                .or_else(|| self.suffixes.library_suffix());
            if let Some(archive_suffix) = archive_suffix {
                if !self.apply_transform(id, mem, archive_suffix, mem_suffix) {
                    trace!(node = %name, "no member to archive transformation");
                }
                self.graph.node_mut(id).suffix = Some(archive_suffix);
            }
        }

        let node = self.graph.node_mut(id);
        if !node.is_target() {
            node.kind.insert(NodeType::DEPENDS);
        }
        self.graph
            .node_mut(mem)
            .kind
            .insert(NodeType::MEMBER | NodeType::JOIN | NodeType::MADE);
    }
}
