//! Self-contained on-disk pack
//!
//! Layout:
//!
//! ```text
//! ┌────────────┬───────────────────────┬─────────┬──────────────────┐
//! │ Header 64B │ Index (bincode)       │ pad → 8 │ Blob             │
//! └────────────┴───────────────────────┴─────────┴──────────────────┘
//! ```
//!
//! Opening maps the file into memory; the blob is a slice of the mapping,
//! so assets are served without being copied.

use crate::core::blob::{align_up, Blob, CHUNK_WIDTH};
use crate::core::catalog::Index;
use crate::core::vfs::EmbeddedFs;
use crate::error::{ImbedError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const MAGIC: [u8; 8] = *b"IMBD\x00\x01\x00\x00";
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

/// Size of the encoded header, including reserved bytes
pub const HEADER_SIZE: usize = 64;

/// Archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Magic number: "IMBD\x00\x01\x00\x00"
    pub magic: [u8; 8],

    pub version_major: u16,

    pub version_minor: u16,

    /// Alignment of assets inside the blob
    pub chunk_width: u32,

    /// Length of the encoded index in bytes
    pub index_len: u64,

    /// Length of the blob in bytes
    pub blob_len: u64,
}

impl Header {
    pub fn new(index_len: u64, blob_len: u64) -> Self {
        Header {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            chunk_width: CHUNK_WIDTH as u32,
            index_len,
            blob_len,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(ImbedError::InvalidMagic);
        }
        if self.version_major != VERSION_MAJOR || self.version_minor != VERSION_MINOR {
            return Err(ImbedError::UnsupportedVersion {
                major: self.version_major,
                minor: self.version_minor,
            });
        }
        if self.chunk_width != CHUNK_WIDTH as u32 {
            return Err(ImbedError::CorruptIndex(format!(
                "chunk width {} (expected {})",
                self.chunk_width, CHUNK_WIDTH
            )));
        }
        Ok(())
    }

    /// Offset of the blob from the start of the archive
    ///
    /// `None` when the header describes an offset past `u64::MAX`.
    pub fn blob_offset(&self) -> Option<u64> {
        let index_end = (HEADER_SIZE as u64).checked_add(self.index_len)?;
        index_end.checked_add(CHUNK_WIDTH as u64 - 1).map(align_up)
    }

    /// Total archive length implied by the header
    pub fn archive_len(&self) -> Option<u64> {
        self.blob_offset()?.checked_add(self.blob_len)
    }

    /// Index and blob ranges inside an archive of `len` bytes
    fn layout(&self, len: usize) -> Result<(Range<usize>, Range<usize>)> {
        match self.archive_len() {
            Some(end) if end <= len as u64 => {}
            _ => return Err(ImbedError::Truncated),
        }
        // every bound is at most `len`, so the conversions cannot fail
        let to_usize = |v: u64| usize::try_from(v).map_err(|_| ImbedError::Truncated);
        let index_end = HEADER_SIZE + to_usize(self.index_len)?;
        let blob_start = to_usize(self.blob_offset().ok_or(ImbedError::Truncated)?)?;
        let blob_end = blob_start + to_usize(self.blob_len)?;
        Ok((HEADER_SIZE..index_end, blob_start..blob_end))
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..10].copy_from_slice(&self.version_major.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.version_minor.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.chunk_width.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.index_len.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.blob_len.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ImbedError::Truncated);
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);

        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let u64_at = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(word)
        };

        Ok(Header {
            magic,
            version_major: u16_at(8),
            version_minor: u16_at(10),
            chunk_width: u32_at(12),
            index_len: u64_at(16),
            blob_len: u64_at(24),
        })
    }
}

/// Encode a pack into archive bytes
pub fn encode(index: &Index, blob: &Blob) -> Result<Vec<u8>> {
    let encoded_index = bincode::serialize(index)?;
    let header = Header::new(encoded_index.len() as u64, blob.len() as u64);

    let blob_start = align_up((HEADER_SIZE + encoded_index.len()) as u64) as usize;

    let mut out = Vec::with_capacity(blob_start + blob.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&encoded_index);
    out.resize(blob_start, 0);
    out.extend_from_slice(blob.as_slice());
    Ok(out)
}

/// Decode archive bytes into a filesystem sharing `data`
pub fn decode(data: Bytes) -> Result<EmbeddedFs> {
    let header = Header::from_bytes(&data)?;
    header.validate()?;
    let (index_range, blob_range) = header.layout(data.len())?;

    let index: Index = bincode::deserialize(&data[index_range])?;
    index.validate()?;

    let blob = Blob::from_bytes(data.slice(blob_range));
    if let Some(record) = index.records().iter().find(|r| blob.slice(r.range).is_none()) {
        return Err(ImbedError::CorruptIndex(format!(
            "range {}..{} of '{}' lies outside the blob",
            record.range.start, record.range.stop, record.name
        )));
    }

    debug!(
        "Decoded archive: {} files, {} directories, {} byte blob",
        index.file_count(),
        index.dir_count(),
        blob.len()
    );
    Ok(EmbeddedFs::new(index, blob))
}

/// Write a pack to `path`, replacing any existing file atomically
pub fn write<P: AsRef<Path>>(path: P, index: &Index, blob: &Blob) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(index, blob)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ImbedError::Io(e.error))?;

    info!(
        "Wrote archive {:?} ({} files, {} bytes)",
        path,
        index.file_count(),
        bytes.len()
    );
    Ok(())
}

/// Open an archive by memory-mapping it
pub fn open<P: AsRef<Path>>(path: P) -> Result<EmbeddedFs> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() < HEADER_SIZE as u64 {
        return Err(ImbedError::Truncated);
    }

    // SAFETY: the archive is treated as read-only; modifying it while mapped
    // is outside the supported use.
    let mmap = unsafe { Mmap::map(&file)? };
    info!("Opened archive {:?} ({} bytes)", path, mmap.len());
    decode(Bytes::from_owner(mmap))
}
