// src/suffix/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::graph::{GraphStore, NodeId, NodeType};

/// Stable handle of a suffix inside a [`SuffixRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuffixId(pub(crate) usize);

impl fmt::Display for SuffixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuffixFlags {
    /// Listed in `.INCLUDES`.
    pub include: bool,
    /// Listed in `.LIBS`.
    pub library: bool,
    /// Files of this suffix may also be found without any suffix.
    pub null: bool,
}

/// A known filename suffix and its place in the transformation graph.
#[derive(Debug, Clone)]
pub struct Suffix {
    pub name: String,
    pub flags: SuffixFlags,
    /// Declaration sequence number; adjacency lists are kept sorted by it.
    pub seq: u32,
    /// Directories from `.PATH<suffix>`.
    pub dirs: Vec<PathBuf>,
    /// Suffixes this one can be transformed into.
    pub parents: Vec<SuffixId>,
    /// Suffixes that can be transformed into this one.
    pub children: Vec<SuffixId>,
}

impl Suffix {
    fn new(name: &str, seq: u32) -> Self {
        Self {
            name: name.to_string(),
            flags: SuffixFlags::default(),
            seq,
            dirs: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// True if `name` ends with this suffix.
    pub fn is_suffix_of(&self, name: &str) -> bool {
        !self.name.is_empty() && name.ends_with(&self.name)
    }
}

/// Ordered set of known suffixes plus the transformation rules between them.
///
/// Suffixes live in an arena so ids stay valid after `clear_suffixes`; only
/// the ordered `list` forgets them. Transformation rule nodes are owned by
/// the [`GraphStore`] and survive a clear, so re-adding the same suffixes
/// relinks them.
#[derive(Debug)]
pub struct SuffixRegistry {
    suffixes: Vec<Suffix>,
    list: Vec<SuffixId>,
    /// The `""` suffix.
    empty_suffix: SuffixId,
    /// Target side of single-suffix rules and the fallback of names without
    /// a known suffix. Starts out as the empty suffix; moved by `.NULL`.
    null_suffix: SuffixId,
    transforms: Vec<NodeId>,
    rules: HashMap<(SuffixId, SuffixId), NodeId>,
    next_seq: u32,
    global_path: Vec<PathBuf>,
}

impl Default for SuffixRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            suffixes: Vec::new(),
            list: Vec::new(),
            empty_suffix: SuffixId(0),
            null_suffix: SuffixId(0),
            transforms: Vec::new(),
            rules: HashMap::new(),
            next_seq: 1,
            global_path: Vec::new(),
        };
        registry.reset_null_suffix();
        registry
    }

    fn reset_null_suffix(&mut self) {
        let id = SuffixId(self.suffixes.len());
        let mut suffix = Suffix::new("", 0);
        suffix.flags.null = true;
        self.suffixes.push(suffix);
        self.empty_suffix = id;
        self.null_suffix = id;
    }

    pub fn get(&self, id: SuffixId) -> &Suffix {
        &self.suffixes[id.0]
    }

    pub fn name(&self, id: SuffixId) -> &str {
        &self.suffixes[id.0].name
    }

    /// Known suffixes in declaration order.
    pub fn list(&self) -> &[SuffixId] {
        &self.list
    }

    pub fn null_suffix(&self) -> SuffixId {
        self.null_suffix
    }

    pub fn empty_suffix(&self) -> SuffixId {
        self.empty_suffix
    }

    /// Every transformation rule node ever declared, in declaration order.
    pub fn transforms(&self) -> &[NodeId] {
        &self.transforms
    }

    pub fn find(&self, name: &str) -> Option<SuffixId> {
        self.list
            .iter()
            .copied()
            .find(|id| self.suffixes[id.0].name == name)
    }

    /// Forget every suffix. Transformation nodes are kept.
    pub fn clear_suffixes(&mut self) {
        debug!(count = self.list.len(), "clearing suffix list");
        self.list.clear();
        self.rules.clear();
        self.next_seq = 1;
        self.reset_null_suffix();
    }

    /// Add a suffix to the end of the list, relinking any transformation
    /// rules and targets whose names now parse as transformations.
    pub fn add_suffix(&mut self, graph: &mut GraphStore, name: &str) -> SuffixId {
        if name.is_empty() {
            return self.empty_suffix;
        }
        if let Some(id) = self.find(name) {
            return id;
        }

        let id = SuffixId(self.suffixes.len());
        self.suffixes.push(Suffix::new(name, self.next_seq));
        self.next_seq += 1;
        self.list.push(id);
        debug!(suffix = %name, %id, "added suffix");

        self.update_targets(graph, id);
        for transform in self.transforms.clone() {
            self.rebuild_rule(graph, transform, id);
        }
        id
    }

    /// Turn already declared targets such as `.c.o` into transformation
    /// rules once both of their suffixes are known.
    fn update_targets(&mut self, graph: &mut GraphStore, suffix: SuffixId) {
        let mut removed_main = false;
        let suffix_name = self.suffixes[suffix.0].name.clone();

        for id in graph.ids().collect::<Vec<_>>() {
            let node = graph.node(id);
            if !node.is_target() || node.kind.contains(NodeType::TRANSFORM) {
                continue;
            }
            if removed_main && graph.main_targets().is_empty() && graph.is_main_candidate(id) {
                graph.offer_main(id);
                continue;
            }
            if !node.name.contains(&suffix_name) {
                continue;
            }
            let name = node.name.clone();
            let Some((src, dst)) = self.parse_transform(&name) else {
                continue;
            };

            if graph.main_targets().contains(&id) {
                debug!(node = %name, "main target became a transformation rule");
                graph.forget_main(id);
                removed_main = true;
            }
            graph.node_mut(id).kind = NodeType::TRANSFORM;
            if !self.transforms.contains(&id) {
                self.transforms.push(id);
            }
            self.link_rule(src, dst, id);
        }
    }

    fn rebuild_rule(&mut self, graph: &GraphStore, transform: NodeId, suffix: SuffixId) {
        let name = graph.name(transform);
        let suffix_name = self.suffixes[suffix.0].name.as_str();

        if name == suffix_name {
            let null = self.null_suffix;
            self.link_rule(suffix, null, transform);
            return;
        }
        if let Some(rest) = name.strip_prefix(suffix_name)
            && let Some(to) = self.find(rest)
        {
            self.link_rule(suffix, to, transform);
            return;
        }
        if let Some(head) = name.strip_suffix(suffix_name)
            && let Some(from) = self.find(head)
        {
            self.link_rule(from, suffix, transform);
        }
    }

    /// Split a rule name into its source and target suffix.
    ///
    /// A pair of known suffixes (`.c.o`) wins over a single known suffix
    /// (`.c`, a rule to the null suffix).
    pub fn parse_transform(&self, name: &str) -> Option<(SuffixId, SuffixId)> {
        let mut single = None;

        for &src in &self.list {
            let Some(rest) = name.strip_prefix(self.suffixes[src.0].name.as_str()) else {
                continue;
            };
            if rest.is_empty() {
                single.get_or_insert(src);
                continue;
            }
            if let Some(dst) = self.find(rest) {
                return Some((src, dst));
            }
        }

        single.map(|src| (src, self.null_suffix))
    }

    pub fn is_transform(&self, name: &str) -> bool {
        self.parse_transform(name).is_some()
    }

    pub fn find_transform(&self, graph: &GraphStore, name: &str) -> Option<NodeId> {
        self.transforms
            .iter()
            .copied()
            .find(|id| graph.name(*id) == name)
    }

    /// (Re)define the transformation rule `name`.
    ///
    /// An existing rule keeps its node but loses its recipe and sources.
    /// Returns `None` if `name` is not a transformation.
    pub fn add_transform(&mut self, graph: &mut GraphStore, name: &str) -> Option<NodeId> {
        let (src, dst) = self.parse_transform(name)?;

        let id = match self.find_transform(graph, name) {
            Some(id) => {
                graph.node_mut(id).commands.clear();
                for child in graph.node(id).children.clone() {
                    graph.remove_child(id, child);
                }
                id
            }
            None => {
                let id = graph.new_internal(name);
                self.transforms.push(id);
                id
            }
        };
        graph.node_mut(id).kind = NodeType::TRANSFORM;

        debug!(
            rule = %name,
            from = %self.name(src),
            to = %self.name(dst),
            "defining transformation"
        );
        self.link_rule(src, dst, id);
        Some(id)
    }

    /// Unlink a transformation rule that ended up with neither commands nor
    /// sources, such as one written only to cancel a built-in rule.
    pub fn end_transform(&mut self, graph: &GraphStore, id: NodeId) {
        let node = graph.node(id);
        if !node.kind.contains(NodeType::TRANSFORM) {
            return;
        }
        if !node.commands.is_empty() || !node.children.is_empty() {
            trace!(rule = %node.name, "transformation has commands or sources");
            return;
        }
        let Some((src, dst)) = self.parse_transform(&node.name) else {
            return;
        };

        debug!(rule = %node.name, "deleting empty transformation");
        self.suffixes[dst.0].children.retain(|s| *s != src);
        self.suffixes[src.0].parents.retain(|s| *s != dst);
        self.rules.remove(&(src, dst));
    }

    fn link_rule(&mut self, src: SuffixId, dst: SuffixId, rule: NodeId) {
        self.relate(src, dst);
        self.rules.insert((src, dst), rule);
    }

    /// Record that `src` can be transformed into `dst`.
    pub fn relate(&mut self, src: SuffixId, dst: SuffixId) {
        let seqs: Vec<u32> = self.suffixes.iter().map(|s| s.seq).collect();
        insert_by_seq(&mut self.suffixes[dst.0].children, src, &seqs);
        insert_by_seq(&mut self.suffixes[src.0].parents, dst, &seqs);
    }

    /// The rule transforming `src` into `dst`, if any.
    pub fn transform_between(&self, src: SuffixId, dst: SuffixId) -> Option<NodeId> {
        self.rules.get(&(src, dst)).copied()
    }

    /// Move the null flag to `name`. Returns `false` if `name` is unknown.
    pub fn set_null(&mut self, name: &str) -> bool {
        let Some(id) = self.find(name) else {
            warn!(suffix = %name, "desired null suffix not defined");
            return false;
        };
        let old = self.null_suffix;
        self.suffixes[old.0].flags.null = false;
        self.suffixes[id.0].flags.null = true;
        self.null_suffix = id;
        true
    }

    pub fn add_include(&mut self, name: &str) -> bool {
        self.flag(name, |f| f.include = true)
    }

    pub fn add_library(&mut self, name: &str) -> bool {
        self.flag(name, |f| f.library = true)
    }

    fn flag(&mut self, name: &str, set: impl FnOnce(&mut SuffixFlags)) -> bool {
        match self.find(name) {
            Some(id) => {
                set(&mut self.suffixes[id.0].flags);
                true
            }
            None => {
                warn!(suffix = %name, "suffix not defined");
                false
            }
        }
    }

    /// First suffix flagged as a library suffix, falling back to `.a`.
    pub fn library_suffix(&self) -> Option<SuffixId> {
        self.list
            .iter()
            .copied()
            .find(|id| self.suffixes[id.0].flags.library)
            .or_else(|| self.find(".a"))
    }

    pub fn set_global_path(&mut self, dirs: Vec<PathBuf>) {
        self.global_path = dirs;
    }

    pub fn add_global_dir(&mut self, dir: PathBuf) {
        if !self.global_path.contains(&dir) {
            self.global_path.push(dir);
        }
    }

    pub fn global_path(&self) -> &[PathBuf] {
        &self.global_path
    }

    /// Append `dir` to the `.PATH<suffix>` list of `name`.
    pub fn add_suffix_dir(&mut self, name: &str, dir: PathBuf) -> bool {
        match self.find(name) {
            Some(id) => {
                let dirs = &mut self.suffixes[id.0].dirs;
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
                true
            }
            None => {
                warn!(suffix = %name, "suffix for .PATH not defined");
                false
            }
        }
    }

    /// Directories searched for files of suffix `id`: the suffix's own
    /// directories, then the global search path.
    pub fn search_path(&self, id: SuffixId) -> Vec<PathBuf> {
        let mut dirs = self.suffixes[id.0].dirs.clone();
        for dir in &self.global_path {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }

    /// Every known suffix that `name` ends with, in declaration order.
    pub fn matching_suffixes(&self, name: &str) -> Vec<SuffixId> {
        self.list
            .iter()
            .copied()
            .filter(|id| self.suffixes[id.0].is_suffix_of(name))
            .collect()
    }

    /// Search path for a file called `name`, chosen by its first matching
    /// suffix.
    pub fn search_path_for_name(&self, name: &str) -> Vec<PathBuf> {
        match self.matching_suffixes(name).first() {
            Some(id) => self.search_path(*id),
            None => self.global_path.clone(),
        }
    }

    /// `-I` flags for the directories of every include suffix.
    pub fn include_flags(&self) -> String {
        self.dir_flags("-I", |f| f.include)
    }

    /// `-L` flags for the directories of every library suffix.
    pub fn library_flags(&self) -> String {
        self.dir_flags("-L", |f| f.library)
    }

    fn dir_flags(&self, flag: &str, select: impl Fn(&SuffixFlags) -> bool) -> String {
        let mut out: Vec<String> = Vec::new();
        for id in &self.list {
            let suffix = &self.suffixes[id.0];
            if !select(&suffix.flags) {
                continue;
            }
            for dir in self.search_path(*id) {
                let entry = format!("{flag}{}", dir.display());
                if !out.contains(&entry) {
                    out.push(entry);
                }
            }
        }
        out.join(" ")
    }

    /// Names of the suffixes that can be transformed into `id`.
    pub fn child_names(&self, id: SuffixId) -> Vec<&str> {
        self.suffixes[id.0]
            .children
            .iter()
            .map(|c| self.suffixes[c.0].name.as_str())
            .collect()
    }

    /// Names of the suffixes `id` can be transformed into.
    pub fn parent_names(&self, id: SuffixId) -> Vec<&str> {
        self.suffixes[id.0]
            .parents
            .iter()
            .map(|p| self.suffixes[p.0].name.as_str())
            .collect()
    }
}

fn insert_by_seq(list: &mut Vec<SuffixId>, id: SuffixId, seqs: &[u32]) {
    if list.contains(&id) {
        return;
    }
    let seq = seqs[id.0];
    let pos = list
        .iter()
        .position(|other| seqs[other.0] > seq)
        .unwrap_or(list.len());
    list.insert(pos, id);
}
