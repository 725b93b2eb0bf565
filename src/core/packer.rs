//! Packs a source directory into a blob and an index
//!
//! The source tree is walked in pre-order: each directory is declared to the
//! [`IndexBuilder`] before anything inside it. Files are packed one at a
//! time through a small pipeline:
//!
//! ```text
//! reader thread ──(tag hasher, optional compressor)──▶ rendezvous channel ──▶ BlobWriter
//! ```
//!
//! The channel has no buffer, so the reader blocks until the blob writer has
//! taken each chunk. The tag is computed over the bytes read from disk, before
//! compression, so it never depends on the compression decision.

use crate::core::blob::{Blob, BlobRange, BlobWriter};
use crate::core::catalog::{AssetRecord, Index, IndexBuilder};
use crate::core::compression::{is_compressible, CompressionMethod, Encoder};
use crate::core::mime::MimeTable;
use crate::core::path::{base_name, clean_path};
use crate::core::tag::TagHasher;
use crate::error::{ImbedError, Result};
use crossbeam::channel::{bounded, Sender};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Size of reads from source files and of chunks handed to the blob writer
const PIPE_CHUNK: usize = 8192;

/// Packing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Compression for compressible content; `none` disables compression
    pub compression: CompressionMethod,

    /// Extension → MIME overrides consulted before the built-in table
    pub mime_types: MimeTable,

    /// Follow symbolic links while walking the source tree
    pub follow_links: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            compression: CompressionMethod::Gzip,
            mime_types: MimeTable::new(),
            follow_links: true,
        }
    }
}

impl PackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that store every asset uncompressed
    pub fn uncompressed() -> Self {
        PackOptions {
            compression: CompressionMethod::None,
            ..Default::default()
        }
    }

    pub fn compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    pub fn mime_type(mut self, ext: &str, mime: impl Into<String>) -> Self {
        self.mime_types.insert(ext, mime);
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Compression to apply to content of the given MIME type
    pub fn method_for(&self, mime: &str) -> CompressionMethod {
        if !self.compression.is_none() && is_compressible(mime) {
            self.compression
        } else {
            CompressionMethod::None
        }
    }
}

/// Pack `source` into a blob and its index
///
/// Any read error aborts the whole operation; no partial index is returned.
pub fn pack<P: AsRef<Path>>(source: P, options: &PackOptions) -> Result<(Blob, Index)> {
    Packer::new(options.clone()).pack(source)
}

/// Walks a source tree and produces a [`Blob`] plus [`Index`]
pub struct Packer {
    options: PackOptions,
}

impl Packer {
    pub fn new(options: PackOptions) -> Self {
        Packer { options }
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    pub fn pack<P: AsRef<Path>>(&self, source: P) -> Result<(Blob, Index)> {
        let source = source.as_ref();
        info!(
            "Packing {:?} (compression: {:?})",
            source, self.options.compression
        );

        let mut builder = IndexBuilder::new();
        let mut blob = BlobWriter::new();

        let walker = WalkDir::new(source)
            .follow_links(self.options.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            let name = relative_name(source, entry.path())?;

            if entry.file_type().is_dir() {
                builder.add_directory(&name)?;
                continue;
            }
            if !entry.file_type().is_file() {
                debug!("Skipping non-regular entry {:?}", entry.path());
                continue;
            }

            let record = self.pack_file(entry.path(), &name, &mut blob)?;
            debug!(
                "Packed {} ({} bytes, {:?}, {} stored)",
                name,
                record.size,
                record.compression,
                record.range.len()
            );
            builder.add_file(&name, record)?;
        }

        let files = builder.file_count();
        let index = builder.build(SystemTime::now());
        let blob = blob.into_blob();
        info!(
            "Packed {} files into {} byte blob ({} bytes logical)",
            files,
            blob.len(),
            index.total_size()
        );
        Ok((blob, index))
    }

    /// Encode one file into the blob and describe it
    fn pack_file(&self, path: &Path, name: &str, blob: &mut BlobWriter) -> Result<AssetRecord> {
        let mime_type = self.options.mime_types.lookup(path);
        let compression = self.options.method_for(&mime_type);
        let file = File::open(path)?;

        blob.begin();
        match encode(file, compression, blob) {
            Ok((range, hasher)) => Ok(AssetRecord {
                name: base_name(name).to_string(),
                mime_type,
                tag: hasher.finish(),
                size: hasher.len(),
                compression,
                range,
            }),
            Err(e) => {
                blob.abort();
                Err(e)
            }
        }
    }
}

/// Run the reader/compressor → blob writer pipeline for one file
fn encode(
    mut file: File,
    method: CompressionMethod,
    blob: &mut BlobWriter,
) -> Result<(BlobRange, TagHasher)> {
    let (tx, rx) = bounded::<Vec<u8>>(0);

    std::thread::scope(|scope| {
        let producer = scope.spawn(move || -> Result<TagHasher> {
            let mut hasher = TagHasher::new();
            let mut encoder = Encoder::new(method, ChunkSender::new(tx))?;
            let mut buf = vec![0u8; PIPE_CHUNK];
            loop {
                let n = match file.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                hasher.update(&buf[..n]);
                encoder.write_all(&buf[..n])?;
            }
            encoder.finish()?.close()?;
            Ok(hasher)
        });

        for chunk in rx.iter() {
            blob.write(&chunk);
        }

        let hasher = producer
            .join()
            .map_err(|_| ImbedError::Io(io::Error::other("pack worker panicked")))??;
        Ok((blob.finish(), hasher))
    })
}

/// Write end of the pipeline: batches bytes into [`PIPE_CHUNK`] sized sends
struct ChunkSender {
    tx: Sender<Vec<u8>>,
    buf: Vec<u8>,
}

impl ChunkSender {
    fn new(tx: Sender<Vec<u8>>) -> Self {
        ChunkSender {
            tx,
            buf: Vec::with_capacity(PIPE_CHUNK),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(PIPE_CHUNK));
        self.tx
            .send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "blob writer went away"))
    }

    /// Send the tail and hang up
    fn close(mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Write for ChunkSender {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = PIPE_CHUNK - self.buf.len();
        let n = room.min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() == PIPE_CHUNK {
            self.send_buffered()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

fn relative_name(source: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(source).map_err(|_| {
        ImbedError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{:?} is outside of {:?}", path, source),
        ))
    })?;
    let joined: PathBuf = rel.components().collect();
    let slashed = joined
        .iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(clean_path(&slashed))
}

fn walk_error(err: walkdir::Error) -> ImbedError {
    let message = err.to_string();
    match err.into_io_error() {
        Some(io) => ImbedError::Io(io),
        None => ImbedError::Io(io::Error::other(message)),
    }
}
