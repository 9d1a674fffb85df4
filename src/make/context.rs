// src/make/context.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;

use crate::archive::{ArArchive, ArchiveModule, split_archive_member};
use crate::fs::FileSystem;
use crate::graph::{GraphStore, NodeId, NodeType};
use crate::suffix::{Resolver, SuffixRegistry};
use crate::types::{ChildOrder, MTime};

/// Knobs of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum number of jobs running at once.
    pub jobs: usize,
    /// Keep building unrelated targets after an error.
    pub keep_going: bool,
    /// Treat failing recipes as successful.
    pub ignore_errors: bool,
    /// Echo recipes instead of running them.
    pub no_execute: bool,
    /// Run nothing; only report whether anything is out of date.
    pub query: bool,
    /// Do not echo recipe lines.
    pub silent: bool,
    pub child_order: ChildOrder,
    /// Seed for `ChildOrder::Random`; entropy if unset.
    pub random_seed: Option<u64>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            keep_going: false,
            ignore_errors: false,
            no_execute: false,
            query: false,
            silent: false,
            child_order: ChildOrder::Declared,
            random_seed: None,
        }
    }
}

/// Everything one build invocation owns.
///
/// Nothing here is global, so several builds can coexist in one process.
#[derive(Debug)]
pub struct BuildContext {
    pub graph: GraphStore,
    pub suffixes: SuffixRegistry,
    pub fs: Arc<dyn FileSystem>,
    pub archive: Arc<dyn ArchiveModule>,
    pub options: BuildOptions,
    /// Recipe inherited by sources nobody knows how to make.
    pub default_node: Option<NodeId>,
    /// Start of the build; stands in for the mtime of targets that are
    /// still missing after being made.
    pub now: MTime,
}

impl BuildContext {
    pub fn new(fs: Arc<dyn FileSystem>, options: BuildOptions) -> Self {
        Self {
            graph: GraphStore::new(),
            suffixes: SuffixRegistry::new(),
            fs,
            archive: Arc::new(ArArchive),
            options,
            default_node: None,
            now: MTime::now(),
        }
    }

    pub fn with_now(mut self, now: MTime) -> Self {
        self.now = now;
        self
    }

    /// Run the implicit source resolver on `id`.
    pub fn find_deps(&mut self, id: NodeId) {
        Resolver::new(&mut self.graph, &self.suffixes, self.fs.as_ref()).find_deps(id);
    }

    /// Directories searched for the file behind `id`.
    pub fn search_path_for(&self, id: NodeId) -> Vec<PathBuf> {
        let node = self.graph.node(id);
        match node.suffix {
            Some(suffix) => self.suffixes.search_path(suffix),
            None => self.suffixes.search_path_for_name(&node.name),
        }
    }

    /// Refresh the mtime of `id` from the file system.
    ///
    /// With `recheck`, any cached `stat` of the file is dropped first.
    pub fn update_mtime(&mut self, id: NodeId, recheck: bool) -> Option<MTime> {
        let node = self.graph.node(id);
        let kind = node.kind;

        let mtime = if kind.contains(NodeType::PHONY) {
            None
        } else if kind.contains(NodeType::ARCHV) {
            match split_archive_member(&node.name) {
                Some((archive, member)) => self.archive_member_mtime(archive, member, recheck),
                None => None,
            }
        } else {
            let known_path = node.path.clone();
            let path = match &known_path {
                Some(p) => p.clone(),
                None if kind.contains(NodeType::NOPATH) => PathBuf::from(&node.name),
                None => self
                    .fs
                    .find_file(&node.name, &self.search_path_for(id))
                    .unwrap_or_else(|| PathBuf::from(&node.name)),
            };
            if recheck {
                self.fs.invalidate(&path);
            }
            let stat = self.fs.stat(&path);
            if stat.is_some() && known_path.is_none() {
                self.graph.node_mut(id).path = Some(path);
            }
            match stat {
                Some(s) => Some(s.mtime),
                None if kind.contains(NodeType::MEMBER) => self.member_mtime_via_parent(id, recheck),
                None => None,
            }
        };

        trace!(node = %self.graph.name(id), mtime = ?mtime, "updated mtime");
        self.graph.node_mut(id).mtime = mtime;
        mtime
    }

    fn archive_member_mtime(&self, archive: &str, member: &str, recheck: bool) -> Option<MTime> {
        let dirs = self.suffixes.search_path_for_name(archive);
        let path = self
            .fs
            .find_file(archive, &dirs)
            .unwrap_or_else(|| PathBuf::from(archive));
        if recheck {
            self.fs.invalidate(&path);
        }
        self.archive.member_mtime(self.fs.as_ref(), &path, member)
    }

    fn member_mtime_via_parent(&self, id: NodeId, recheck: bool) -> Option<MTime> {
        let member = self.graph.name(id);
        self.graph.node(id).parents.iter().find_map(|p| {
            let parent = self.graph.node(*p);
            if !parent.kind.contains(NodeType::ARCHV) {
                return None;
            }
            let (archive, _) = split_archive_member(&parent.name)?;
            self.archive_member_mtime(archive, member, recheck)
        })
    }
}
