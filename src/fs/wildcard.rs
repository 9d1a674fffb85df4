// src/fs/wildcard.rs

//! Wildcard expansion of source names (`*.c`, `src/[ab].c`).
//!
//! Only the last path component may contain wildcards; the directory part
//! is listed through the [`FileSystem`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::Glob;
use tracing::debug;

use super::FileSystem;

pub fn has_wildcards(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Expand `pattern` to the sorted list of matching names.
///
/// Names are returned the way they would be written in a dependency line:
/// relative to the current directory when the pattern has no directory.
pub fn expand_wildcards(fs: &dyn FileSystem, pattern: &str) -> Result<Vec<String>> {
    let (dir, file_pattern) = match pattern.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, pattern),
    };
    if dir.is_some_and(has_wildcards) {
        anyhow::bail!("wildcards are only supported in the last path component: {pattern}");
    }

    let matcher = Glob::new(file_pattern)
        .with_context(|| format!("invalid wildcard pattern {pattern:?}"))?
        .compile_matcher();

    let list_dir: PathBuf = match dir {
        Some(d) if !d.is_empty() => PathBuf::from(d),
        Some(_) => PathBuf::from("/"),
        None => PathBuf::from("."),
    };

    let mut out: Vec<String> = fs
        .read_dir(&list_dir)?
        .into_iter()
        .filter_map(|entry| {
            let file_name = entry.file_name()?.to_str()?.to_string();
            if !matcher.is_match(Path::new(&file_name)) {
                return None;
            }
            Some(match dir {
                Some(d) => format!("{d}/{file_name}"),
                None => file_name,
            })
        })
        .collect();
    out.sort();

    debug!(pattern = %pattern, matches = out.len(), "expanded wildcard");
    Ok(out)
}
