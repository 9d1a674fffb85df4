// src/fs/mock.rs

use super::{FileStat, FileSystem};
use crate::types::MTime;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { contents: Vec<u8>, mtime: MTime },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem with explicit modification times.
///
/// Clones share the same entries, so a test can keep a handle and touch
/// files while a build runs.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or replace) an empty file with the given mtime in seconds.
    pub fn add_file(&self, path: impl AsRef<Path>, mtime_secs: u64) {
        self.add_file_with_contents(path, Vec::new(), MTime::from_secs(mtime_secs));
    }

    pub fn add_file_with_contents(
        &self,
        path: impl AsRef<Path>,
        contents: impl Into<Vec<u8>>,
        mtime: MTime,
    ) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.entries();
        files.insert(
            path.clone(),
            MockEntry::File {
                contents: contents.into(),
                mtime,
            },
        );
        link_into_parent(&mut files, &path);
    }

    /// Set a file's mtime, creating it if needed.
    pub fn touch(&self, path: impl AsRef<Path>, mtime: MTime) {
        let path = path.as_ref();
        let mut files = self.entries();
        match files.get_mut(path) {
            Some(MockEntry::File { mtime: m, .. }) => *m = mtime,
            _ => {
                files.insert(
                    path.to_path_buf(),
                    MockEntry::File {
                        contents: Vec::new(),
                        mtime,
                    },
                );
                link_into_parent(&mut files, path);
            }
        }
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut files = self.entries();
        files.remove(path);
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && let Some(MockEntry::Dir(children)) = files.get_mut(parent_of(path))
        {
            children.retain(|c| c != name);
        }
    }

    pub fn mtime_of(&self, path: impl AsRef<Path>) -> Option<MTime> {
        match self.entries().get(path.as_ref()) {
            Some(MockEntry::File { mtime, .. }) => Some(*mtime),
            _ => None,
        }
    }
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// Ensure parent directories exist implicitly and list `path` in its parent.
fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let parent = parent_of(path);
    if parent == path {
        return;
    }
    if !files.contains_key(parent) {
        files.insert(parent.to_path_buf(), MockEntry::Dir(Vec::new()));
        link_into_parent(files, parent);
    }
    if let Some(MockEntry::Dir(children)) = files.get_mut(parent)
        && let Some(name) = path.file_name().and_then(|n| n.to_str())
        && !children.iter().any(|c| c == name)
    {
        children.push(name.to_string());
    }
}

impl FileSystem for MockFileSystem {
    fn stat(&self, path: &Path) -> Option<FileStat> {
        let files = self.entries();
        let path = path.strip_prefix("./").unwrap_or(path);
        match files.get(path) {
            Some(MockEntry::File { mtime, .. }) => Some(FileStat {
                mtime: *mtime,
                is_dir: false,
            }),
            Some(MockEntry::Dir(_)) => Some(FileStat {
                mtime: MTime::from_nanos(0),
                is_dir: true,
            }),
            None => None,
        }
    }

    fn invalidate(&self, _path: &Path) {}

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let files = self.entries();
        match files.get(path) {
            Some(MockEntry::File { contents, .. }) => Ok(Box::new(Cursor::new(contents.clone()))),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}
