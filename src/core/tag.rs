//! Content tags: stable fingerprints of an asset's uncompressed bytes
//!
//! A tag is the xxh3-64 digest of the logical content, hex encoded. It never
//! depends on how the asset was stored, so it doubles as the HTTP `ETag`.

use std::time::{SystemTime, UNIX_EPOCH};
use xxhash_rust::xxh3::Xxh3;

/// Incremental tag computation
#[derive(Clone)]
pub struct TagHasher {
    state: Xxh3,
    bytes: u64,
}

impl Default for TagHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl TagHasher {
    pub fn new() -> Self {
        TagHasher {
            state: Xxh3::new(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
        self.bytes += data.len() as u64;
    }

    /// Number of bytes hashed so far (the logical size)
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub fn finish(&self) -> String {
        hex::encode(self.state.digest().to_be_bytes())
    }
}

/// Tag of an in-memory buffer
pub fn tag_of(data: &[u8]) -> String {
    let mut hasher = TagHasher::new();
    hasher.update(data);
    hasher.finish()
}

/// Tag for a live file that has no packed record
///
/// Derived from size and modification time, the same inputs a stat-based
/// cache validator would use.
pub fn tag_of_metadata(size: u64, modified: SystemTime) -> String {
    let (secs, nanos) = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs(), d.subsec_nanos()),
        Err(_) => (0, 0),
    };
    format!("{:x}-{:x}-{:x}", secs, nanos, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tag_is_deterministic() {
        assert_eq!(tag_of(b"same content"), tag_of(b"same content"));
        assert_eq!(tag_of(b"same content").len(), 16);
    }

    #[test]
    fn test_tag_changes_with_content() {
        assert_ne!(tag_of(b"content a"), tag_of(b"content b"));
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = b"split across several updates".repeat(50);
        let mut hasher = TagHasher::new();
        for chunk in data.chunks(7) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finish(), tag_of(&data));
        assert_eq!(hasher.len(), data.len() as u64);
    }

    #[test]
    fn test_metadata_tag() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(tag_of_metadata(10, t), tag_of_metadata(10, t));
        assert_ne!(tag_of_metadata(10, t), tag_of_metadata(11, t));
    }
}
