#![allow(dead_code)]

use makedag::config::{BuildFile, DependencyLine, RawBuildFile};
use makedag::types::DependencyOp;

/// Builder for `BuildFile` to simplify test setup.
pub struct BuildFileBuilder {
    raw: RawBuildFile,
}

impl BuildFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawBuildFile::default(),
        }
    }

    pub fn suffixes(mut self, names: &[&str]) -> Self {
        self.raw.suffixes.list.extend(names.iter().map(|s| s.to_string()));
        self
    }

    pub fn null_suffix(mut self, name: &str) -> Self {
        self.raw.suffixes.null = Some(name.to_string());
        self
    }

    pub fn library_suffix(mut self, name: &str) -> Self {
        self.raw.suffixes.library.push(name.to_string());
        self
    }

    pub fn global_path(mut self, dir: &str) -> Self {
        self.raw.paths.global.push(dir.to_string());
        self
    }

    pub fn suffix_path(mut self, suffix: &str, dir: &str) -> Self {
        self.raw
            .paths
            .suffix
            .entry(suffix.to_string())
            .or_default()
            .push(dir.to_string());
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.raw.config.jobs = jobs;
        self
    }

    pub fn keep_going(mut self, val: bool) -> Self {
        self.raw.config.keep_going = val;
        self
    }

    pub fn ignore_errors(mut self, val: bool) -> Self {
        self.raw.config.ignore_errors = val;
        self
    }

    pub fn no_execute(mut self, val: bool) -> Self {
        self.raw.config.no_execute = val;
        self
    }

    pub fn query(mut self, val: bool) -> Self {
        self.raw.config.query = val;
        self
    }

    pub fn randomize(mut self, seed: u64) -> Self {
        self.raw.config.randomize_targets = true;
        self.raw.config.random_seed = Some(seed);
        self
    }

    pub fn main(mut self, targets: &[&str]) -> Self {
        self.raw.main.extend(targets.iter().map(|s| s.to_string()));
        self
    }

    pub fn dependency(mut self, line: DependencyLine) -> Self {
        self.raw.dependency.push(line);
        self
    }

    /// Shorthand for a `targets: sources` line with a recipe.
    pub fn rule(self, target: &str, sources: &[&str], commands: &[&str]) -> Self {
        let mut dep = DependencyBuilder::new(&[target]).sources(sources);
        for c in commands {
            dep = dep.command(c);
        }
        self.dependency(dep.build())
    }

    pub fn build_raw(self) -> RawBuildFile {
        self.raw
    }

    pub fn build(self) -> BuildFile {
        BuildFile::try_from(self.raw).expect("Failed to build valid build file from builder")
    }
}

impl Default for BuildFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[dependency]]` line.
pub struct DependencyBuilder {
    line: DependencyLine,
}

impl DependencyBuilder {
    pub fn new(targets: &[&str]) -> Self {
        Self {
            line: DependencyLine {
                targets: targets.iter().map(|s| s.to_string()).collect(),
                op: DependencyOp::Depends,
                sources: vec![],
                commands: vec![],
            },
        }
    }

    pub fn op(mut self, op: DependencyOp) -> Self {
        self.line.op = op;
        self
    }

    pub fn double_colon(self) -> Self {
        self.op(DependencyOp::DoubleDep)
    }

    pub fn force(self) -> Self {
        self.op(DependencyOp::Force)
    }

    pub fn source(mut self, name: &str) -> Self {
        self.line.sources.push(name.to_string());
        self
    }

    pub fn sources(mut self, names: &[&str]) -> Self {
        self.line.sources.extend(names.iter().map(|s| s.to_string()));
        self
    }

    pub fn command(mut self, line: &str) -> Self {
        self.line.commands.push(line.to_string());
        self
    }

    pub fn build(self) -> DependencyLine {
        self.line
    }
}
