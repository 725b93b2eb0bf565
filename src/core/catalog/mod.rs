//! Index catalog: the directory tree plus flat lookup tables
//!
//! The index maps normalized paths (see [`crate::core::path`]) to asset
//! records and directory nodes. Nodes live in an arena addressed by
//! [`DirId`]/[`FileId`]; the tree structure is expressed through child id
//! lists, so the flat tables and the tree share one copy of every node.
//!
//! The index is produced once by [`IndexBuilder`] and never mutated after.

pub mod metadata;

pub use metadata::{
    AssetRecord, DirId, DirectoryNode, FileId, FileType, Metadata, DIR_PERMISSIONS,
    FILE_PERMISSIONS, MODE_DIR,
};

use crate::core::path::{ancestors, split_parent};
use crate::error::{ImbedError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A directory or file found in the index
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Dir(&'a DirectoryNode),
    File(&'a AssetRecord),
}

impl<'a> Entry<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Entry::Dir(d) => &d.name,
            Entry::File(f) => &f.name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Dir(_))
    }

    /// Stat-style metadata, stamped with the index build time
    pub fn metadata(&self, modified: SystemTime) -> Metadata {
        match self {
            Entry::Dir(d) => Metadata::for_directory(d, modified),
            Entry::File(f) => Metadata::for_asset(f, modified),
        }
    }
}

/// Immutable directory tree and path lookup tables of one pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    dirs: Vec<DirectoryNode>,
    files: Vec<AssetRecord>,
    path_to_dir: BTreeMap<String, DirId>,
    path_to_file: BTreeMap<String, FileId>,
    built_at: SystemTime,
}

impl Index {
    /// Id of the root directory
    pub const ROOT: DirId = DirId(0);

    pub fn root(&self) -> &DirectoryNode {
        self.dir_node(Self::ROOT)
    }

    /// The single modification time shared by every entry
    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    pub fn dir_node(&self, id: DirId) -> &DirectoryNode {
        &self.dirs[id.0 as usize]
    }

    pub fn file_record(&self, id: FileId) -> &AssetRecord {
        &self.files[id.0 as usize]
    }

    /// Directory at a normalized path
    pub fn dir(&self, path: &str) -> Option<&DirectoryNode> {
        self.path_to_dir.get(path).map(|id| self.dir_node(*id))
    }

    /// Asset record at a normalized path
    pub fn file(&self, path: &str) -> Option<&AssetRecord> {
        self.path_to_file.get(path).map(|id| self.file_record(*id))
    }

    /// Directory or file at a normalized path
    pub fn entry(&self, path: &str) -> Option<Entry<'_>> {
        if let Some(dir) = self.dir(path) {
            return Some(Entry::Dir(dir));
        }
        self.file(path).map(Entry::File)
    }

    /// Children of a directory, sorted by name
    pub fn children(&self, dir: &DirectoryNode) -> Vec<Entry<'_>> {
        let mut children: Vec<Entry<'_>> = dir
            .dirs
            .iter()
            .map(|id| Entry::Dir(self.dir_node(*id)))
            .chain(dir.files.iter().map(|id| Entry::File(self.file_record(*id))))
            .collect();
        children.sort_by(|a, b| a.name().cmp(b.name()));
        children
    }

    /// Every file path, sorted
    pub fn file_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.path_to_file.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Every directory path (root included), sorted
    pub fn dir_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.path_to_dir.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Total logical size of every asset
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Check the ancestor-exists invariant and arena consistency
    ///
    /// Used on indexes read back from disk; a freshly built index satisfies
    /// it by construction. Besides every ancestor being present, the arena
    /// must form a tree that agrees with the path tables: each node is
    /// listed exactly once, by the directory at its parent path, under its
    /// base name.
    pub fn validate(&self) -> Result<()> {
        if self.dirs.is_empty() || self.path_to_dir.get("") != Some(&Self::ROOT) {
            return Err(ImbedError::CorruptIndex("root directory missing".into()));
        }
        let paths = self.path_to_dir.keys().chain(self.path_to_file.keys());
        for path in paths {
            for ancestor in ancestors(path) {
                if !self.path_to_dir.contains_key(ancestor) {
                    return Err(ImbedError::MissingAncestor {
                        path: path.clone(),
                        ancestor: ancestor.to_string(),
                    });
                }
            }
        }
        let dir_ids_ok = self.path_to_dir.values().all(|id| (id.0 as usize) < self.dirs.len());
        let file_ids_ok = self.path_to_file.values().all(|id| (id.0 as usize) < self.files.len());
        let children_ok = self.dirs.iter().all(|d| {
            d.dirs.iter().all(|id| (id.0 as usize) < self.dirs.len())
                && d.files.iter().all(|id| (id.0 as usize) < self.files.len())
        });
        if !(dir_ids_ok && file_ids_ok && children_ok) {
            return Err(ImbedError::CorruptIndex("arena id out of range".into()));
        }
        self.validate_tree()
    }

    fn validate_tree(&self) -> Result<()> {
        let corrupt = |msg: String| Err(ImbedError::CorruptIndex(msg));

        if self.path_to_dir.len() != self.dirs.len() || self.path_to_file.len() != self.files.len() {
            return corrupt("path tables do not cover the arena".into());
        }

        let mut dir_parents = vec![0usize; self.dirs.len()];
        let mut file_parents = vec![0usize; self.files.len()];
        for node in &self.dirs {
            for id in &node.dirs {
                dir_parents[id.0 as usize] += 1;
            }
            for id in &node.files {
                file_parents[id.0 as usize] += 1;
            }
        }
        if dir_parents[Self::ROOT.0 as usize] != 0 {
            return corrupt("root directory listed as a child".into());
        }

        for (path, id) in &self.path_to_dir {
            if *id == Self::ROOT {
                if !path.is_empty() {
                    return corrupt(format!("'{}' maps to the root directory", path));
                }
                continue;
            }
            let (parent, name) = split_parent(path);
            let listed = self
                .path_to_dir
                .get(parent)
                .is_some_and(|p| self.dir_node(*p).dirs.contains(id));
            if dir_parents[id.0 as usize] != 1 || !listed || self.dir_node(*id).name != name {
                return corrupt(format!("directory '{}' is not a tree node", path));
            }
        }

        for (path, id) in &self.path_to_file {
            let (parent, name) = split_parent(path);
            let listed = self
                .path_to_dir
                .get(parent)
                .is_some_and(|p| self.dir_node(*p).files.contains(id));
            if file_parents[id.0 as usize] != 1 || !listed || self.file_record(*id).name != name {
                return corrupt(format!("file '{}' is not a tree node", path));
            }
        }
        Ok(())
    }

    pub(crate) fn records(&self) -> &[AssetRecord] {
        &self.files
    }
}

/// Drop the sub-second part of a timestamp
///
/// HTTP dates carry whole seconds; a build time with nanoseconds would never
/// compare equal to a client's `If-Modified-Since`.
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => UNIX_EPOCH,
    }
}

/// Builds an [`Index`] from a pre-order stream of declarations
///
/// A directory must be declared before anything inside it. Declaring an
/// entry whose parent is unknown is a build invariant violation and fails
/// the build.
#[derive(Debug)]
pub struct IndexBuilder {
    dirs: Vec<DirectoryNode>,
    files: Vec<AssetRecord>,
    path_to_dir: BTreeMap<String, DirId>,
    path_to_file: BTreeMap<String, FileId>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        let mut path_to_dir = BTreeMap::new();
        path_to_dir.insert(String::new(), Index::ROOT);
        IndexBuilder {
            dirs: vec![DirectoryNode::default()],
            files: Vec::new(),
            path_to_dir,
            path_to_file: BTreeMap::new(),
        }
    }

    fn parent_of(&self, path: &str) -> Result<(DirId, String)> {
        let (parent, name) = split_parent(path);
        match self.path_to_dir.get(parent) {
            Some(id) => Ok((*id, name.to_string())),
            None => Err(ImbedError::MissingAncestor {
                path: path.to_string(),
                ancestor: parent.to_string(),
            }),
        }
    }

    /// Declare a directory at a normalized path
    ///
    /// Declaring the root or an existing directory again is a no-op.
    pub fn add_directory(&mut self, path: &str) -> Result<DirId> {
        if let Some(id) = self.path_to_dir.get(path) {
            return Ok(*id);
        }
        if self.path_to_file.contains_key(path) {
            return Err(ImbedError::DuplicateEntry(path.to_string()));
        }
        let (parent, name) = self.parent_of(path)?;

        let id = DirId(self.dirs.len() as u32);
        self.dirs.push(DirectoryNode::new(name));
        self.dirs[parent.0 as usize].dirs.push(id);
        self.path_to_dir.insert(path.to_string(), id);
        Ok(id)
    }

    /// Declare a file at a normalized path
    ///
    /// The record's name is set to the path's base name.
    pub fn add_file(&mut self, path: &str, mut record: AssetRecord) -> Result<FileId> {
        if path.is_empty()
            || self.path_to_file.contains_key(path)
            || self.path_to_dir.contains_key(path)
        {
            return Err(ImbedError::DuplicateEntry(path.to_string()));
        }
        let (parent, name) = self.parent_of(path)?;
        record.name = name;

        let id = FileId(self.files.len() as u32);
        self.files.push(record);
        self.dirs[parent.0 as usize].files.push(id);
        self.path_to_file.insert(path.to_string(), id);
        Ok(id)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Freeze into an immutable index stamped with `built_at`
    pub fn build(self, built_at: SystemTime) -> Index {
        Index {
            dirs: self.dirs,
            files: self.files,
            path_to_dir: self.path_to_dir,
            path_to_file: self.path_to_file,
            built_at: truncate_to_secs(built_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blob::BlobRange;
    use crate::core::compression::CompressionMethod;

    fn record(size: u64) -> AssetRecord {
        AssetRecord {
            name: String::new(),
            mime_type: "text/plain".into(),
            tag: "t".into(),
            size,
            compression: CompressionMethod::None,
            range: BlobRange { start: 0, stop: size },
        }
    }

    fn sample() -> Index {
        let mut builder = IndexBuilder::new();
        builder.add_directory("").unwrap();
        builder.add_directory("js").unwrap();
        builder.add_directory("css").unwrap();
        builder.add_directory("css/vendor").unwrap();
        builder.add_file("index.html", record(12)).unwrap();
        builder.add_file("css/site.css", record(4)).unwrap();
        builder.add_file("css/vendor/reset.css", record(3)).unwrap();
        builder.add_file("js/app.js", record(7)).unwrap();
        builder.add_file("about.html", record(5)).unwrap();
        builder.build(UNIX_EPOCH + Duration::from_millis(1_700_000_000_750))
    }

    #[test]
    fn test_lookup_tables() {
        let index = sample();
        assert_eq!(index.file_count(), 5);
        assert_eq!(index.dir_count(), 4);
        assert_eq!(index.file("css/site.css").unwrap().name, "site.css");
        assert_eq!(index.dir("css/vendor").unwrap().name, "vendor");
        assert!(index.file("css").is_none());
        assert!(index.entry("css").unwrap().is_dir());
        assert!(index.entry("missing").is_none());
        assert_eq!(index.total_size(), 31);
    }

    #[test]
    fn test_every_ancestor_exists() {
        let index = sample();
        for path in index.file_paths() {
            for ancestor in ancestors(path) {
                assert!(index.dir(ancestor).is_some(), "{} missing for {}", ancestor, path);
            }
        }
        index.validate().unwrap();
    }

    #[test]
    fn test_children_sorted_by_name() {
        let index = sample();
        let names: Vec<_> = index.children(index.root()).iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["about.html", "css", "index.html", "js"]);
        // stored order is discovery order
        assert_eq!(index.dir_node(index.root().dirs[0]).name, "js");
    }

    #[test]
    fn test_missing_ancestor_is_build_error() {
        let mut builder = IndexBuilder::new();
        let err = builder.add_file("docs/readme.md", record(1)).unwrap_err();
        match err {
            ImbedError::MissingAncestor { path, ancestor } => {
                assert_eq!(path, "docs/readme.md");
                assert_eq!(ancestor, "docs");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            builder.add_directory("a/b"),
            Err(ImbedError::MissingAncestor { .. })
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut builder = IndexBuilder::new();
        builder.add_file("a.txt", record(1)).unwrap();
        assert!(matches!(
            builder.add_file("a.txt", record(1)),
            Err(ImbedError::DuplicateEntry(_))
        ));
        assert!(matches!(
            builder.add_directory("a.txt"),
            Err(ImbedError::DuplicateEntry(_))
        ));
        builder.add_directory("d").unwrap();
        assert_eq!(builder.add_directory("d").unwrap(), DirId(1));
        assert!(matches!(
            builder.add_file("d", record(1)),
            Err(ImbedError::DuplicateEntry(_))
        ));
    }

    #[test]
    fn test_build_time_truncated() {
        let index = sample();
        assert_eq!(
            index.built_at(),
            UNIX_EPOCH + Duration::from_secs(1_700_000_000)
        );
    }

    #[test]
    fn test_empty_directory_kept() {
        let mut builder = IndexBuilder::new();
        builder.add_directory("empty").unwrap();
        let index = builder.build(UNIX_EPOCH);
        assert!(index.dir("empty").unwrap().is_empty());
        assert_eq!(index.dir_paths(), vec!["", "empty"]);
    }

    #[test]
    fn test_validate_rejects_self_cycle() {
        let mut index = sample();
        let css = index.path_to_dir["css"];
        index.dirs[css.0 as usize].dirs.push(css);

        let bytes = bincode::serialize(&index).unwrap();
        let decoded: Index = bincode::deserialize(&bytes).unwrap();
        assert!(matches!(decoded.validate(), Err(ImbedError::CorruptIndex(_))));
    }

    #[test]
    fn test_validate_rejects_misplaced_nodes() {
        // directory listed under the wrong parent
        let mut index = sample();
        let js = index.path_to_dir["js"];
        let css = index.path_to_dir["css"];
        index.dirs[Index::ROOT.0 as usize].dirs.retain(|id| *id != js);
        index.dirs[css.0 as usize].dirs.push(js);
        assert!(matches!(index.validate(), Err(ImbedError::CorruptIndex(_))));

        // root listed as a child
        let mut index = sample();
        index.dirs[css.0 as usize].dirs.push(Index::ROOT);
        assert!(matches!(index.validate(), Err(ImbedError::CorruptIndex(_))));

        // file listed twice
        let mut index = sample();
        let site = index.path_to_file["css/site.css"];
        index.dirs[Index::ROOT.0 as usize].files.push(site);
        assert!(matches!(index.validate(), Err(ImbedError::CorruptIndex(_))));

        // record name disagrees with its path
        let mut index = sample();
        index.files[site.0 as usize].name = "other.css".into();
        assert!(matches!(index.validate(), Err(ImbedError::CorruptIndex(_))));
    }

    #[test]
    fn test_identical_builds_encode_identically() {
        let a = bincode::serialize(&sample()).unwrap();
        let b = bincode::serialize(&sample()).unwrap();
        assert_eq!(a, b);
    }
}
