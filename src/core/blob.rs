//! Contiguous, append-only byte region holding every packed asset
//!
//! Assets are appended one after another. Each asset starts on a
//! [`CHUNK_WIDTH`] boundary and its tail is zero-padded to the next one, so
//! the recorded ranges are disjoint and, padded, tile the whole blob.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Storage alignment of every asset in the blob (bytes)
pub const CHUNK_WIDTH: usize = 8;

/// Half-open byte range `[start, stop)` of one asset inside the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRange {
    pub start: u64,
    pub stop: u64,
}

impl BlobRange {
    /// Number of stored (possibly compressed) bytes
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// End of the range once padded to the storage alignment
    pub fn padded_stop(&self) -> u64 {
        align_up(self.stop)
    }

    fn as_usize(&self) -> Range<usize> {
        self.start as usize..self.stop as usize
    }
}

/// Round `offset` up to the next [`CHUNK_WIDTH`] boundary
pub fn align_up(offset: u64) -> u64 {
    let width = CHUNK_WIDTH as u64;
    offset.div_ceil(width) * width
}

/// Immutable packed byte region
///
/// Cloning is cheap: the bytes are reference counted and slices alias the
/// same storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
}

impl Blob {
    pub fn from_bytes(data: Bytes) -> Self {
        Blob { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored bytes of one asset, sharing the blob's storage
    ///
    /// Returns `None` when the range lies outside the blob.
    pub fn slice(&self, range: BlobRange) -> Option<Bytes> {
        if range.start > range.stop || range.stop > self.data.len() as u64 {
            return None;
        }
        Some(self.data.slice(range.as_usize()))
    }

    /// The whole blob as a borrowed byte slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Append-only writer that produces a [`Blob`]
///
/// One asset is open at a time: [`begin`](Self::begin) starts it,
/// [`write`](Self::write) appends encoded bytes, [`finish`](Self::finish)
/// pads and returns the asset's range.
#[derive(Debug, Default)]
pub struct BlobWriter {
    data: Vec<u8>,
    current: Option<u64>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current end of the blob
    pub fn offset(&self) -> u64 {
        self.data.len() as u64
    }

    /// Start a new asset at the current (aligned) offset
    pub fn begin(&mut self) -> u64 {
        debug_assert!(self.current.is_none(), "previous asset not finished");
        debug_assert_eq!(self.offset() % CHUNK_WIDTH as u64, 0);
        let start = self.offset();
        self.current = Some(start);
        start
    }

    /// Append encoded bytes to the open asset
    pub fn write(&mut self, chunk: &[u8]) {
        debug_assert!(self.current.is_some(), "write outside of an asset");
        self.data.extend_from_slice(chunk);
    }

    /// Close the open asset, zero-padding the blob to the next boundary
    pub fn finish(&mut self) -> BlobRange {
        let start = self.current.take().unwrap_or_else(|| self.offset());
        let stop = self.offset();
        self.data.resize(align_up(stop) as usize, 0);
        BlobRange { start, stop }
    }

    /// Drop a partially written asset
    pub fn abort(&mut self) {
        if let Some(start) = self.current.take() {
            self.data.truncate(start as usize);
        }
    }

    pub fn into_blob(self) -> Blob {
        Blob::from_bytes(Bytes::from(self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(9), 16);
    }

    #[test]
    fn test_ranges_tile_blob() {
        let mut writer = BlobWriter::new();
        let mut ranges = Vec::new();
        for payload in [&b"hello"[..], b"", b"0123456789abcdef", b"xyz"] {
            writer.begin();
            writer.write(payload);
            ranges.push(writer.finish());
        }
        let blob = writer.into_blob();

        let mut expected_start = 0;
        for range in &ranges {
            assert_eq!(range.start, expected_start);
            assert_eq!(range.start % CHUNK_WIDTH as u64, 0);
            expected_start = range.padded_stop();
        }
        assert_eq!(expected_start, blob.len() as u64);

        assert_eq!(blob.slice(ranges[0]).unwrap().as_ref(), b"hello");
        assert!(blob.slice(ranges[1]).unwrap().is_empty());
        assert_eq!(blob.slice(ranges[3]).unwrap().as_ref(), b"xyz");
    }

    #[test]
    fn test_padding_is_zero() {
        let mut writer = BlobWriter::new();
        writer.begin();
        writer.write(b"abc");
        writer.finish();
        let blob = writer.into_blob();
        assert_eq!(blob.as_slice(), b"abc\0\0\0\0\0");
    }

    #[test]
    fn test_abort_discards_partial_asset() {
        let mut writer = BlobWriter::new();
        writer.begin();
        writer.write(b"keep");
        writer.finish();
        writer.begin();
        writer.write(b"partial");
        writer.abort();
        assert_eq!(writer.offset(), 8);
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let blob = Blob::from_bytes(Bytes::from_static(b"12345678"));
        assert!(blob.slice(BlobRange { start: 4, stop: 16 }).is_none());
    }
}
