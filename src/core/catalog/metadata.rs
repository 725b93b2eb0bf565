//! Index records and the stat-style metadata derived from them

use crate::core::blob::BlobRange;
use crate::core::compression::CompressionMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Directory bit of [`Metadata::mode`] (same value as POSIX `S_IFDIR`)
pub const MODE_DIR: u32 = 0o040000;

/// Permission bits of every packed file
pub const FILE_PERMISSIONS: u32 = 0o444;

/// Permission bits of every packed directory
pub const DIR_PERMISSIONS: u32 = 0o555;

/// Position of a directory in the index arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirId(pub(crate) u32);

/// Position of a file in the index arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub(crate) u32);

/// File type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// One packed file
///
/// Contains everything about an asset except its bytes, which live in the
/// blob at `range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Base name, unique within the parent directory
    pub name: String,

    /// MIME content type
    pub mime_type: String,

    /// Fingerprint of the uncompressed content
    pub tag: String,

    /// Logical (uncompressed) size in bytes
    pub size: u64,

    /// How the stored bytes are encoded
    pub compression: CompressionMethod,

    /// Stored bytes inside the blob
    pub range: BlobRange,
}

impl AssetRecord {
    pub fn is_compressed(&self) -> bool {
        !self.compression.is_none()
    }

    /// Number of bytes actually stored in the blob
    pub fn stored_size(&self) -> u64 {
        self.range.len()
    }
}

/// Directory in the index tree
///
/// Children are kept in discovery order; listings sort them by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Base name (empty for the root)
    pub name: String,

    /// Child directories
    pub dirs: Vec<DirId>,

    /// Child files
    pub files: Vec<FileId>,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        DirectoryNode {
            name: name.into(),
            dirs: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Stat-style description of a file or directory
///
/// Produced for packed entries and for live files alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    size: u64,
    permissions: u32,
    file_type: FileType,
    modified: SystemTime,
}

impl Metadata {
    /// Metadata of a packed file
    pub fn for_asset(record: &AssetRecord, modified: SystemTime) -> Self {
        Metadata {
            name: record.name.clone(),
            size: record.size,
            permissions: FILE_PERMISSIONS,
            file_type: FileType::File,
            modified,
        }
    }

    /// Metadata of a packed directory
    pub fn for_directory(node: &DirectoryNode, modified: SystemTime) -> Self {
        Metadata {
            name: node.name.clone(),
            size: 0,
            permissions: DIR_PERMISSIONS,
            file_type: FileType::Directory,
            modified,
        }
    }

    /// Metadata of a live file, named by its base name
    pub fn from_std(name: impl Into<String>, meta: &fs::Metadata) -> Self {
        let file_type = if meta.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        Metadata {
            name: name.into(),
            size: if meta.is_dir() { 0 } else { meta.len() },
            permissions: std_permissions(meta),
            file_type,
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical size in bytes (0 for directories)
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Permission bits
    pub fn permissions(&self) -> u32 {
        self.permissions
    }

    /// Permission bits plus [`MODE_DIR`] for directories
    pub fn mode(&self) -> u32 {
        match self.file_type {
            FileType::Directory => MODE_DIR | self.permissions,
            FileType::File => self.permissions,
        }
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}

#[cfg(unix)]
fn std_permissions(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn std_permissions(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, true) => DIR_PERMISSIONS,
        (true, false) => 0o755,
        (false, true) => FILE_PERMISSIONS,
        (false, false) => 0o644,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AssetRecord {
        AssetRecord {
            name: "app.js".into(),
            mime_type: "text/javascript".into(),
            tag: "00".into(),
            size: 120,
            compression: CompressionMethod::Gzip,
            range: BlobRange { start: 8, stop: 72 },
        }
    }

    #[test]
    fn test_asset_metadata() {
        let now = SystemTime::now();
        let meta = Metadata::for_asset(&record(), now);
        assert_eq!(meta.name(), "app.js");
        assert_eq!(meta.size(), 120);
        assert_eq!(meta.mode(), 0o444);
        assert!(meta.is_file());
        assert_eq!(meta.modified(), now);
    }

    #[test]
    fn test_directory_metadata() {
        let meta = Metadata::for_directory(&DirectoryNode::new("css"), UNIX_EPOCH);
        assert!(meta.is_dir());
        assert_eq!(meta.size(), 0);
        assert_eq!(meta.mode(), MODE_DIR | 0o555);
    }

    #[test]
    fn test_record_sizes() {
        let r = record();
        assert!(r.is_compressed());
        assert_eq!(r.stored_size(), 64);
    }
}
