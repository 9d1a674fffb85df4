// src/archive.rs

//! Archive module boundary.
//!
//! Library (`-lname`) and archive-member (`lib.a(member.o)`) nodes get their
//! modification times and staleness from an [`ArchiveModule`]. Reading
//! archive members is out of scope: [`ArArchive`] recognises archives by
//! their magic and dates members by the archive itself.

use std::fmt::Debug;
use std::io::Read;
use std::path::Path;

use tracing::trace;

use crate::fs::FileSystem;
use crate::types::MTime;

const AR_MAGIC: &[u8] = b"!<arch>\n";

/// What the out-of-date evaluator needs to know about a library node.
#[derive(Debug, Clone, Copy)]
pub struct LibraryState {
    pub mtime: Option<MTime>,
    /// mtime of the youngest child; the outer `None` means no child has
    /// been recorded yet.
    pub youngest_child: Option<Option<MTime>>,
    pub has_children: bool,
    pub is_target: bool,
    pub phony: bool,
}

pub trait ArchiveModule: Send + Sync + Debug {
    /// Whether `path` names an archive.
    fn is_archive(&self, fs: &dyn FileSystem, path: &Path) -> bool;

    /// Modification time of `member` inside `archive`.
    fn member_mtime(&self, fs: &dyn FileSystem, archive: &Path, member: &str) -> Option<MTime>;

    /// Whether a library needs relinking.
    fn library_out_of_date(&self, lib: &LibraryState, now: MTime) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArArchive;

impl ArchiveModule for ArArchive {
    fn is_archive(&self, fs: &dyn FileSystem, path: &Path) -> bool {
        let Ok(mut reader) = fs.open_read(path) else {
            return false;
        };
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).is_ok() && magic == AR_MAGIC
    }

    fn member_mtime(&self, fs: &dyn FileSystem, archive: &Path, member: &str) -> Option<MTime> {
        if !self.is_archive(fs, archive) {
            trace!(archive = %archive.display(), member, "not an archive");
            return None;
        }
        fs.stat(archive).map(|s| s.mtime)
    }

    fn library_out_of_date(&self, lib: &LibraryState, now: MTime) -> bool {
        if lib.phony {
            return true;
        }
        if !lib.is_target && !lib.has_children {
            return false;
        }
        let from_future = lib.mtime > Some(now);
        match lib.youngest_child {
            None => lib.has_children || from_future,
            Some(youngest) => from_future || lib.mtime < youngest,
        }
    }
}

/// Split `lib.a(member.o)` into `("lib.a", "member.o")`.
pub fn split_archive_member(name: &str) -> Option<(&str, &str)> {
    let open = name.find('(')?;
    let inner = name[open + 1..].strip_suffix(')')?;
    if open == 0 || inner.is_empty() {
        return None;
    }
    Some((&name[..open], inner))
}
