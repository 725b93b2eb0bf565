//! Read-only virtual filesystem over a pack
//!
//! [`FileSystem`] is the seam between storage and consumers: the HTTP
//! server, extraction and the CLI all go through it. Two implementations
//! exist:
//!
//! - [`EmbeddedFs`]: the packed index and blob, entirely in memory
//! - [`OverlayFs`]: a live directory consulted first, the pack second
//!
//! Paths are index paths (see [`crate::core::path`]); every implementation
//! cleans its input, so `"/css/../index.html"` and `"index.html"` name the
//! same entry.

pub mod embedded;
pub mod file;
pub mod overlay;


pub use embedded::{Asset, EmbeddedFs};
pub use file::{CompressedFile, DirectoryFile, LiveFile, RegularFile};
pub use overlay::OverlayFs;

use crate::core::catalog::Metadata;
use crate::core::path::{clean_path, join};
use crate::error::{ImbedError, Result};
use std::io::{self, SeekFrom};

/// An open file or directory
///
/// Handles are single-owner. Once [`close`](File::close) has been called,
/// every further operation fails with [`ImbedError::AlreadyClosed`].
pub trait File: Send {
    /// Read bytes; directories always read 0
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reposition; only supported on files backed by stored bytes
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Next `count` directory entries, sorted by name
    ///
    /// `count <= 0` returns every remaining entry (possibly none). With
    /// `count > 0`, an exhausted listing yields [`ImbedError::Eof`].
    fn readdir(&mut self, count: isize) -> Result<Vec<Metadata>>;

    fn stat(&self) -> Result<Metadata>;

    fn close(&mut self) -> Result<()>;
}

impl io::Read for dyn File + '_ {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Seek for dyn File + '_ {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        File::seek(self, pos).map_err(io::Error::from)
    }
}

/// Answer of a walk visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    /// On a directory: skip its children. On a file: skip its remaining siblings.
    SkipDir,
}

/// Visitor called for every walked entry
///
/// Receives the entry's index path, its metadata and the error hit while
/// opening or listing it, if any. Returning `Err` aborts the walk with that
/// error.
pub type Visit<'a> = dyn FnMut(&str, &Metadata, Option<ImbedError>) -> Result<WalkControl> + 'a;

/// Filesystem of packed (and possibly live) assets
pub trait FileSystem: Send + Sync {
    fn open(&self, path: &str) -> Result<Box<dyn File>>;

    fn stat(&self, path: &str) -> Result<Metadata>;

    /// Packed asset at `path`, when the entry is served from the pack
    fn asset(&self, _path: &str) -> Option<Asset> {
        None
    }

    /// Pre-order walk from `root`, children sorted by name
    fn walk(&self, root: &str, visit: &mut Visit<'_>) -> Result<()> {
        walk(self, root, visit)
    }
}

/// Walk any [`FileSystem`] from `root`
///
/// A root that cannot be stat'ed fails the walk before the visitor runs.
pub fn walk<F: FileSystem + ?Sized>(fs: &F, root: &str, visit: &mut Visit<'_>) -> Result<()> {
    let root = clean_path(root);
    let meta = fs.stat(&root)?;
    walk_entry(fs, &root, &meta, visit).map(|_| ())
}

fn walk_entry<F: FileSystem + ?Sized>(
    fs: &F,
    path: &str,
    meta: &Metadata,
    visit: &mut Visit<'_>,
) -> Result<WalkControl> {
    let control = visit(path, meta, None)?;
    if !meta.is_dir() {
        return Ok(control);
    }
    if control == WalkControl::SkipDir {
        return Ok(WalkControl::Continue);
    }

    let mut children = match list_dir(fs, path) {
        Ok(children) => children,
        Err(e) => {
            visit(path, meta, Some(e))?;
            return Ok(WalkControl::Continue);
        }
    };
    children.sort_by(|a, b| a.name().cmp(b.name()));

    for child in &children {
        let child_path = join(path, child.name());
        if walk_entry(fs, &child_path, child, visit)? == WalkControl::SkipDir {
            break;
        }
    }
    Ok(WalkControl::Continue)
}

/// Full listing of a directory
pub fn list_dir<F: FileSystem + ?Sized>(fs: &F, path: &str) -> Result<Vec<Metadata>> {
    let mut dir = fs.open(path)?;
    let entries = dir.readdir(0);
    dir.close()?;
    entries
}
