//! Live directory layered over a pack
//!
//! Every call goes to the live filesystem first; nothing is cached, so edits
//! to the live tree show up on the next request. Entries missing from the
//! live tree fall back to the pack.

use super::embedded::{Asset, EmbeddedFs};
use super::file::{DirCursor, DirectoryFile, LiveFile};
use super::{File, FileSystem};
use crate::core::catalog::Metadata;
use crate::core::path::{base_name, clean_path};
use crate::error::{ImbedError, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Live directory tree consulted before an [`EmbeddedFs`]
#[derive(Debug, Clone)]
pub struct OverlayFs {
    root: PathBuf,
    embedded: EmbeddedFs,
}

/// Errors meaning "not on the live side", as opposed to real failures
fn falls_back(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

impl OverlayFs {
    /// Layer the directory at `root` over `embedded`
    ///
    /// `root` must be an existing directory.
    pub fn new<P: AsRef<Path>>(root: P, embedded: EmbeddedFs) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let meta = fs::metadata(&root)?;
        if !meta.is_dir() {
            return Err(ImbedError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("overlay root {:?} is not a directory", root),
            )));
        }
        debug!("Overlaying {:?} on {} packed files", root, embedded.index().file_count());
        Ok(OverlayFs { root, embedded })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn embedded(&self) -> &EmbeddedFs {
        &self.embedded
    }

    fn live_path(&self, cleaned: &str) -> PathBuf {
        let mut path = self.root.clone();
        if !cleaned.is_empty() {
            path.extend(cleaned.split('/'));
        }
        path
    }

    /// Live metadata, `None` when the path is absent from the live tree
    fn live_stat(&self, cleaned: &str) -> Result<Option<fs::Metadata>> {
        match fs::metadata(self.live_path(cleaned)) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if falls_back(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Live entries (sorted) followed by packed entries they do not shadow
    fn merged_listing(&self, cleaned: &str) -> Result<Vec<Metadata>> {
        let mut live = Vec::new();
        for entry in fs::read_dir(self.live_path(cleaned))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match fs::metadata(entry.path()) {
                Ok(meta) => meta,
                // dangling symlink
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            live.push(Metadata::from_std(name, &meta));
        }
        live.sort_by(|a, b| a.name().cmp(b.name()));

        let packed = match self.embedded.listing(cleaned) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(ImbedError::InvalidOperation(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        let shadowed: HashSet<String> = live.iter().map(|m| m.name().to_string()).collect();
        live.extend(packed.into_iter().filter(|m| !shadowed.contains(m.name())));
        Ok(live)
    }
}

impl FileSystem for OverlayFs {
    fn open(&self, path: &str) -> Result<Box<dyn File>> {
        let cleaned = clean_path(path);
        let Some(meta) = self.live_stat(&cleaned)? else {
            return self.embedded.open(&cleaned);
        };

        let stat = Metadata::from_std(base_name(&cleaned), &meta);
        if meta.is_dir() {
            let entries = self.merged_listing(&cleaned)?;
            return Ok(Box::new(DirectoryFile::new(stat, DirCursor::ordered(entries))));
        }
        let file = fs::File::open(self.live_path(&cleaned))?;
        Ok(Box::new(LiveFile::new(stat, file)))
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        let cleaned = clean_path(path);
        match self.live_stat(&cleaned)? {
            Some(meta) => Ok(Metadata::from_std(base_name(&cleaned), &meta)),
            None => self.embedded.stat(&cleaned),
        }
    }

    /// Packed asset, unless the live tree has something at `path`
    fn asset(&self, path: &str) -> Option<Asset> {
        let cleaned = clean_path(path);
        match self.live_stat(&cleaned) {
            Ok(None) => self.embedded.get(&cleaned),
            _ => None,
        }
    }
}
