// src/fs/mod.rs

//! Directory cache boundary.
//!
//! The build core never touches `std::fs` directly: existence and
//! modification times come through [`FileSystem`], so tests can swap in
//! [`mock::MockFileSystem`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use filetime::FileTime;
use tracing::trace;

use crate::types::MTime;

pub mod mock;
pub mod wildcard;

pub use mock::MockFileSystem;
pub use wildcard::{expand_wildcards, has_wildcards};

/// What a successful `stat` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mtime: MTime,
    pub is_dir: bool,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Modification time and kind of `path`, or `None` if it does not exist.
    fn stat(&self, path: &Path) -> Option<FileStat>;

    /// Forget any cached `stat` result for `path`.
    fn invalidate(&self, path: &Path);

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;

    /// Locate `name`: names with a directory part are checked as given,
    /// bare names in the current directory first and then in each of
    /// `dirs`.
    fn find_file(&self, name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
        let direct = Path::new(name);
        if self.stat(direct).is_some() {
            return Some(direct.to_path_buf());
        }
        if name.contains('/') {
            return None;
        }
        dirs.iter()
            .map(|dir| dir.join(name))
            .find(|candidate| self.stat(candidate).is_some())
    }
}

/// Implementation that uses `std::fs`, caching `stat` results until they are
/// invalidated.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem {
    cache: Arc<Mutex<HashMap<PathBuf, Option<FileStat>>>>,
}

impl RealFileSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileSystem for RealFileSystem {
    fn stat(&self, path: &Path) -> Option<FileStat> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(path) {
            return *hit;
        }

        let stat = fs::metadata(path).ok().map(|meta| {
            let ft = FileTime::from_last_modification_time(&meta);
            let secs = u64::try_from(ft.unix_seconds()).unwrap_or(0);
            FileStat {
                mtime: MTime::from_nanos(
                    secs.saturating_mul(1_000_000_000)
                        .saturating_add(u64::from(ft.nanoseconds())),
                ),
                is_dir: meta.is_dir(),
            }
        });
        trace!(path = %path.display(), exists = stat.is_some(), "stat");
        cache.insert(path.to_path_buf(), stat);
        stat
    }

    fn invalidate(&self, path: &Path) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.remove(path);
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }
}
