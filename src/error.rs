//! Error types for packing, lookup, serving and extraction

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, ImbedError>;

/// Errors produced by imbed operations
#[derive(Error, Debug)]
pub enum ImbedError {
    /// No entry exists at the path
    #[error("No such file or directory: {0}")]
    NotFound(String),

    /// The operation is not valid for this kind of file
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// The file handle has already been closed
    #[error("File already closed")]
    AlreadyClosed,

    /// End of a directory listing
    #[error("End of stream")]
    Eof,

    /// Extraction target exists with different content
    #[error("Target already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Extraction target exists with a different file type
    #[error("Target type mismatch (file vs directory): {0}")]
    TypeMismatch(PathBuf),

    /// An entry was declared before its parent directory
    #[error("Build invariant violated: ancestor '{ancestor}' of '{path}' was not declared")]
    MissingAncestor { path: String, ancestor: String },

    /// An entry was declared twice
    #[error("Build invariant violated: duplicate entry '{0}'")]
    DuplicateEntry(String),

    /// An asset the caller asserted to exist is missing
    #[error("Asset must exist but was not found: {0}")]
    AssetMissing(String),

    /// Invalid magic number in archive header
    #[error("Invalid magic number in archive header")]
    InvalidMagic,

    /// Unsupported archive version
    #[error("Unsupported archive version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// Archive is shorter than its header claims
    #[error("Archive truncated")]
    Truncated,

    /// Index read from an archive is inconsistent
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Index (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// TLS settings or key material are unusable
    #[error("TLS error: {0}")]
    Tls(String),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ImbedError {
    /// True for lookups that found nothing
    pub fn is_not_found(&self) -> bool {
        match self {
            ImbedError::NotFound(_) => true,
            ImbedError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<ImbedError> for io::Error {
    fn from(err: ImbedError) -> Self {
        match err {
            ImbedError::Io(e) => e,
            ImbedError::NotFound(_) | ImbedError::AssetMissing(_) => {
                io::Error::new(io::ErrorKind::NotFound, err)
            }
            ImbedError::InvalidOperation(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            ImbedError::AlreadyExists(_) | ImbedError::TypeMismatch(_) => {
                io::Error::new(io::ErrorKind::AlreadyExists, err)
            }
            ImbedError::Eof | ImbedError::Truncated => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
