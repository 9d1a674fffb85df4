// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::DependencyOp;

/// Build description as read from a TOML file, before validation.
///
/// ```toml
/// main = ["prog"]
///
/// [config]
/// jobs = 4
///
/// [suffixes]
/// list = [".c", ".o"]
///
/// [[dependency]]
/// targets = [".c.o"]
/// commands = ["cc -c ${.IMPSRC} -o ${.TARGET}"]
///
/// [[dependency]]
/// targets = ["prog"]
/// sources = ["main.o", "util.o"]
/// commands = ["cc -o $@ $>"]
/// ```
///
/// Dependency lines are applied in file order, exactly as a makefile's
/// would be, so special targets such as `.SUFFIXES` or `.PATH.c` may appear
/// among them as well.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBuildFile {
    /// Default goals; if empty, the first eligible target is used.
    #[serde(default)]
    pub main: Vec<String>,

    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub suffixes: SuffixSection,

    #[serde(default)]
    pub paths: PathSection,

    #[serde(default)]
    pub dependency: Vec<DependencyLine>,
}

/// Validated build description. Construct via `TryFrom<RawBuildFile>`.
#[derive(Debug, Clone)]
pub struct BuildFile {
    pub main: Vec<String>,
    pub config: ConfigSection,
    pub suffixes: SuffixSection,
    pub paths: PathSection,
    pub dependency: Vec<DependencyLine>,
}

impl BuildFile {
    pub(crate) fn new_unchecked(raw: RawBuildFile) -> Self {
        Self {
            main: raw.main,
            config: raw.config,
            suffixes: raw.suffixes,
            paths: raw.paths,
            dependency: raw.dependency,
        }
    }
}

/// `[config]` section: defaults for the command-line switches.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of jobs running at once.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    #[serde(default)]
    pub keep_going: bool,

    #[serde(default)]
    pub ignore_errors: bool,

    #[serde(default)]
    pub no_execute: bool,

    #[serde(default)]
    pub query: bool,

    #[serde(default)]
    pub silent: bool,

    /// Request the children of a node in random order.
    #[serde(default)]
    pub randomize_targets: bool,

    /// Seed for `randomize_targets`, for reproducible runs.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_jobs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            keep_going: false,
            ignore_errors: false,
            no_execute: false,
            query: false,
            silent: false,
            randomize_targets: false,
            random_seed: None,
        }
    }
}

/// `[suffixes]` section, applied before any dependency line.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SuffixSection {
    /// Known suffixes in declaration order.
    #[serde(default)]
    pub list: Vec<String>,

    /// Suffix tried for names without a known suffix.
    #[serde(default)]
    pub null: Option<String>,

    /// Suffixes whose search path feeds `.INCLUDES`.
    #[serde(default)]
    pub include: Vec<String>,

    /// Suffixes whose search path feeds `.LIBS`.
    #[serde(default)]
    pub library: Vec<String>,
}

/// `[paths]` section: the global `.PATH` and per-suffix `.PATH<suffix>`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathSection {
    #[serde(default)]
    pub global: Vec<String>,

    #[serde(default)]
    pub suffix: BTreeMap<String, Vec<String>>,
}

/// One `[[dependency]]` entry: `targets op sources` plus a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyLine {
    pub targets: Vec<String>,

    /// `":"`, `"::"` or `"!"`.
    #[serde(default)]
    pub op: DependencyOp,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub commands: Vec<String>,
}
