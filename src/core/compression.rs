//! Compression policy and streaming codecs for packed assets
//!
//! **Design**:
//! - Only textual content is compressed (see [`is_compressible`])
//! - The method is recorded per asset, so readers decompress transparently
//! - Methods double as HTTP content codings (`gzip`, `zstd`)

use crate::error::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Compression method for packed assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionMethod {
    /// Stored as-is
    None = 0,
    /// Gzip at best compression
    #[default]
    Gzip = 1,
    /// Zstd
    Zstd = 2,
}

/// Zstd level used when packing (the packer favours ratio over speed)
const ZSTD_LEVEL: i32 = 19;

impl CompressionMethod {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionMethod::None),
            1 => Some(CompressionMethod::Gzip),
            2 => Some(CompressionMethod::Zstd),
            _ => None,
        }
    }

    /// Parse a method name as used in configuration and on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" | "off" => Some(CompressionMethod::None),
            "gzip" | "gz" => Some(CompressionMethod::Gzip),
            "zstd" | "zst" => Some(CompressionMethod::Zstd),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CompressionMethod::None)
    }

    /// HTTP content-coding token for this method
    pub fn content_coding(&self) -> Option<&'static str> {
        match self {
            CompressionMethod::None => None,
            CompressionMethod::Gzip => Some("gzip"),
            CompressionMethod::Zstd => Some("zstd"),
        }
    }
}

/// Whether content of this MIME type is worth compressing
pub fn is_compressible(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime.ends_with("+xml")
        || mime.contains("javascript")
        || mime == "application/xml"
}

/// Streaming compressor in front of a sink
///
/// Must be [`finish`](Encoder::finish)ed to flush trailing frames.
pub enum Encoder<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    pub fn new(method: CompressionMethod, sink: W) -> Result<Self> {
        Ok(match method {
            CompressionMethod::None => Encoder::Plain(sink),
            CompressionMethod::Gzip => Encoder::Gzip(GzEncoder::new(sink, Compression::best())),
            CompressionMethod::Zstd => {
                Encoder::Zstd(zstd::stream::write::Encoder::new(sink, ZSTD_LEVEL)?)
            }
        })
    }

    /// Flush the codec and hand back the sink
    pub fn finish(self) -> io::Result<W> {
        match self {
            Encoder::Plain(mut sink) => {
                sink.flush()?;
                Ok(sink)
            }
            Encoder::Gzip(encoder) => encoder.finish(),
            Encoder::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Plain(sink) => sink.write(buf),
            Encoder::Gzip(encoder) => encoder.write(buf),
            Encoder::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Plain(sink) => sink.flush(),
            Encoder::Gzip(encoder) => encoder.flush(),
            Encoder::Zstd(encoder) => encoder.flush(),
        }
    }
}

/// Forward-only decompressing reader over stored bytes
pub fn decoder<R>(method: CompressionMethod, stored: R) -> Result<Box<dyn Read + Send>>
where
    R: Read + Send + 'static,
{
    Ok(match method {
        CompressionMethod::None => Box::new(stored),
        CompressionMethod::Gzip => Box::new(GzDecoder::new(stored)),
        CompressionMethod::Zstd => Box::new(zstd::stream::read::Decoder::new(stored)?),
    })
}

/// Compress a whole buffer
pub fn compress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(method, Vec::with_capacity(data.len() / 2))?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a whole buffer
pub fn decompress(data: &[u8], method: CompressionMethod) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match method {
        CompressionMethod::None => out.extend_from_slice(data),
        CompressionMethod::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out)?;
        }
        CompressionMethod::Zstd => {
            zstd::stream::read::Decoder::new(data)?.read_to_end(&mut out)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_method_conversion() {
        assert_eq!(CompressionMethod::from_u8(0), Some(CompressionMethod::None));
        assert_eq!(CompressionMethod::from_u8(1), Some(CompressionMethod::Gzip));
        assert_eq!(CompressionMethod::from_u8(2), Some(CompressionMethod::Zstd));
        assert_eq!(CompressionMethod::from_u8(99), None);
        assert_eq!(CompressionMethod::parse("GZIP"), Some(CompressionMethod::Gzip));
        assert_eq!(CompressionMethod::parse("brotli"), None);
    }

    #[test]
    fn test_compressible_mime_types() {
        assert!(is_compressible("text/html; charset=utf-8"));
        assert!(is_compressible("image/svg+xml"));
        assert!(is_compressible("application/javascript"));
        assert!(is_compressible("text/javascript"));
        assert!(is_compressible("application/xml"));
        assert!(!is_compressible("image/png"));
        assert!(!is_compressible("application/binary"));
        assert!(!is_compressible("application/json"));
    }

    #[test]
    fn test_gzip_compression() {
        let data = b"Hello, World! ".repeat(100);
        let compressed = compress(&data, CompressionMethod::Gzip).unwrap();
        let decompressed = decompress(&compressed, CompressionMethod::Gzip).unwrap();

        assert_eq!(data.as_slice(), decompressed.as_slice());
        assert!(compressed.len() < data.len());
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_zstd_compression() {
        let data = b"Zstandard compression test data! ".repeat(100);
        let compressed = compress(&data, CompressionMethod::Zstd).unwrap();
        let decompressed = decompress(&compressed, CompressionMethod::Zstd).unwrap();

        assert_eq!(data.as_slice(), decompressed.as_slice());
        assert!(compressed.len() < data.len());
    }

    #[test]
    fn test_streaming_decoder() {
        let data = b"<html><body>streamed</body></html>".repeat(20);
        let compressed = compress(&data, CompressionMethod::Gzip).unwrap();
        let mut reader =
            decoder(CompressionMethod::Gzip, std::io::Cursor::new(compressed)).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_no_compression() {
        let data = b"Test data";
        let compressed = compress(data, CompressionMethod::None).unwrap();
        let decompressed = decompress(&compressed, CompressionMethod::None).unwrap();

        assert_eq!(data, compressed.as_slice());
        assert_eq!(data, decompressed.as_slice());
    }

    #[test]
    fn test_content_coding() {
        assert_eq!(CompressionMethod::Gzip.content_coding(), Some("gzip"));
        assert_eq!(CompressionMethod::Zstd.content_coding(), Some("zstd"));
        assert_eq!(CompressionMethod::None.content_coding(), None);
    }
}
