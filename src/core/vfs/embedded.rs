//! In-memory filesystem over a packed index and blob

use super::file::{CompressedFile, DirCursor, DirectoryFile, RegularFile};
use super::overlay::OverlayFs;
use super::{File, FileSystem};
use crate::core::blob::Blob;
use crate::core::catalog::{AssetRecord, Entry, Index, Metadata};
use crate::core::compression::{decoder, CompressionMethod};
use crate::core::path::clean_path;
use crate::error::{ImbedError, Result};
use bytes::Bytes;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// A packed file: its record plus a view of its stored bytes
#[derive(Debug, Clone)]
pub struct Asset {
    record: AssetRecord,
    stored: Bytes,
    modified: SystemTime,
}

impl Asset {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn mime_type(&self) -> &str {
        &self.record.mime_type
    }

    /// Fingerprint of the uncompressed content
    pub fn tag(&self) -> &str {
        &self.record.tag
    }

    /// Logical (uncompressed) size
    pub fn size(&self) -> u64 {
        self.record.size
    }

    pub fn is_compressed(&self) -> bool {
        self.record.is_compressed()
    }

    pub fn compression(&self) -> CompressionMethod {
        self.record.compression
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn record(&self) -> &AssetRecord {
        &self.record
    }

    pub fn metadata(&self) -> Metadata {
        Metadata::for_asset(&self.record, self.modified)
    }

    /// Owned copy of the decompressed content
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.record.size as usize);
        self.reader()?.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Stored bytes as they sit in the blob (compressed if the asset is)
    pub fn raw_bytes(&self) -> &[u8] {
        &self.stored
    }

    /// Shared handle to the stored bytes
    pub fn stored(&self) -> Bytes {
        self.stored.clone()
    }

    /// Streaming reader over the decompressed content
    pub fn reader(&self) -> Result<Box<dyn Read + Send>> {
        decoder(self.record.compression, Cursor::new(self.stored.clone()))
    }

    /// Copy the decompressed content into `out`
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> Result<u64> {
        let mut reader = self.reader()?;
        Ok(io::copy(&mut reader, out)?)
    }

    /// Content as text, invalid UTF-8 replaced
    pub fn to_string_lossy(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.bytes()?).into_owned())
    }
}

/// Read-only filesystem over one pack
///
/// Cloning shares the index and the blob.
#[derive(Debug, Clone)]
pub struct EmbeddedFs {
    index: Arc<Index>,
    blob: Blob,
}

impl EmbeddedFs {
    pub fn new(index: Index, blob: Blob) -> Self {
        Self::from_shared(Arc::new(index), blob)
    }

    pub fn from_shared(index: Arc<Index>, blob: Blob) -> Self {
        EmbeddedFs { index, blob }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    /// Packed asset at `path`, or `None`
    pub fn get(&self, path: &str) -> Option<Asset> {
        let record = self.index.file(&clean_path(path))?;
        self.asset_for(record).ok()
    }

    /// Packed asset that is known to exist
    ///
    /// A miss means the caller's assumption about the pack is wrong and is
    /// reported as [`ImbedError::AssetMissing`].
    pub fn must(&self, path: &str) -> Result<Asset> {
        let cleaned = clean_path(path);
        match self.index.file(&cleaned) {
            Some(record) => self.asset_for(record),
            None => Err(ImbedError::AssetMissing(cleaned)),
        }
    }

    /// Open a file without decompressing it
    ///
    /// Reads return the stored bytes; directories open as usual.
    pub fn open_raw(&self, path: &str) -> Result<Box<dyn File>> {
        let path = clean_path(path);
        match self.lookup(&path)? {
            Entry::Dir(_) => self.open_dir(&path),
            Entry::File(record) => {
                let meta = Metadata::for_asset(record, self.index.built_at());
                Ok(Box::new(RegularFile::new(meta, self.stored(record)?)))
            }
        }
    }

    /// This pack behind a live directory tree
    pub fn overlayed_with<P: AsRef<Path>>(&self, live_root: P) -> Result<OverlayFs> {
        OverlayFs::new(live_root, self.clone())
    }

    fn lookup(&self, path: &str) -> Result<Entry<'_>> {
        self.index
            .entry(path)
            .ok_or_else(|| ImbedError::NotFound(path.to_string()))
    }

    fn stored(&self, record: &AssetRecord) -> Result<Bytes> {
        self.blob.slice(record.range).ok_or_else(|| {
            ImbedError::CorruptIndex(format!("range of '{}' lies outside the blob", record.name))
        })
    }

    fn asset_for(&self, record: &AssetRecord) -> Result<Asset> {
        Ok(Asset {
            record: record.clone(),
            stored: self.stored(record)?,
            modified: self.index.built_at(),
        })
    }

    /// Metadata of every child of the directory at `path`, sorted by name
    pub(crate) fn listing(&self, path: &str) -> Result<Vec<Metadata>> {
        let dir = match self.lookup(path)? {
            Entry::Dir(dir) => dir,
            Entry::File(_) => return Err(ImbedError::InvalidOperation("readdir on a file")),
        };
        let modified = self.index.built_at();
        Ok(self
            .index
            .children(dir)
            .iter()
            .map(|e| e.metadata(modified))
            .collect())
    }

    fn open_dir(&self, path: &str) -> Result<Box<dyn File>> {
        let meta = self.lookup(path)?.metadata(self.index.built_at());
        let entries = self.listing(path)?;
        Ok(Box::new(DirectoryFile::new(meta, DirCursor::ordered(entries))))
    }
}

impl FileSystem for EmbeddedFs {
    fn open(&self, path: &str) -> Result<Box<dyn File>> {
        let path = clean_path(path);
        match self.lookup(&path)? {
            Entry::Dir(_) => self.open_dir(&path),
            Entry::File(record) => {
                let meta = Metadata::for_asset(record, self.index.built_at());
                let stored = self.stored(record)?;
                if record.is_compressed() {
                    let reader = decoder(record.compression, Cursor::new(stored))?;
                    Ok(Box::new(CompressedFile::new(meta, reader)))
                } else {
                    Ok(Box::new(RegularFile::new(meta, stored)))
                }
            }
        }
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        let path = clean_path(path);
        Ok(self.lookup(&path)?.metadata(self.index.built_at()))
    }

    fn asset(&self, path: &str) -> Option<Asset> {
        self.get(path)
    }
}
