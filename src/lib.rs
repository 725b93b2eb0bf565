//! # imbed - Static Asset Packing and Serving
//!
//! `imbed-rs` packs a directory tree into a single immutable blob plus an
//! index, and exposes the result as a read-only virtual filesystem:
//!
//! - **Packing** with per-file MIME detection, content tags and optional
//!   gzip or zstd compression of textual content
//! - **Virtual filesystem** with stat, open, read, seek, readdir and walk
//! - **Overlay** of a live directory on top of the pack for development
//! - **HTTP serving** with conditional requests and transparent compression
//! - **Extraction** of the packed tree back onto disk
//! - **Archives**: a pack stored as one file and memory-mapped on open
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imbed_rs::{pack, EmbeddedFs, FileSystem, PackOptions, Result};
//!
//! # fn main() -> Result<()> {
//! let (blob, index) = pack("public", &PackOptions::default())?;
//! let fs = EmbeddedFs::new(index, blob);
//!
//! let page = fs.must("index.html")?;
//! println!("{} ({}, tag {})", page.name(), page.mime_type(), page.tag());
//!
//! let meta = fs.stat("css")?;
//! assert!(meta.is_dir());
//! # Ok(())
//! # }
//! ```
//!
//! ## Archives and Serving
//!
//! ```rust,no_run
//! use imbed_rs::{archive, AssetServer, PackOptions, ServerOptions, Result};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let (blob, index) = imbed_rs::pack("public", &PackOptions::default())?;
//! archive::write("site.imbd", &index, &blob)?;
//!
//! let fs = archive::open("site.imbd")?;
//! let server = AssetServer::new(
//!     Arc::new(fs),
//!     ServerOptions::new().prefix("/static").not_found("404.html"),
//! );
//! # let _ = server;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod server;
pub mod tls;

pub use crate::config::Config;
pub use crate::core::{
    archive,
    blob::{Blob, BlobRange, CHUNK_WIDTH},
    catalog::{AssetRecord, FileType, Index, IndexBuilder, Metadata},
    compression::CompressionMethod,
    extract::{copy_to, ExtractMode},
    mime::{MimeTable, DEFAULT_MIME},
    packer::{PackOptions, Packer},
    vfs::{Asset, EmbeddedFs, File, FileSystem, OverlayFs, WalkControl},
};
pub use crate::error::{ImbedError, Result};
pub use crate::server::{AssetBody, AssetServer, ServerOptions, DEFAULT_NOT_FOUND};

use std::path::Path;

/// Pack the directory at `source` into a blob and its index
///
/// Shorthand for [`Packer::pack`].
pub fn pack<P: AsRef<Path>>(source: P, options: &PackOptions) -> Result<(Blob, Index)> {
    crate::core::packer::pack(source, options)
}

/// Pack `source` and open the result as a filesystem in one step
pub fn pack_fs<P: AsRef<Path>>(source: P, options: &PackOptions) -> Result<EmbeddedFs> {
    let (blob, index) = pack(source, options)?;
    Ok(EmbeddedFs::new(index, blob))
}
