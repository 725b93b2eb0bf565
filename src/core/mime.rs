//! MIME type lookup by file extension

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Type used for files whose extension is unknown
pub const DEFAULT_MIME: &str = "application/binary";

/// Extension → MIME table: explicit overrides first, then `mime_guess`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct MimeTable {
    overrides: HashMap<String, String>,
}

impl From<HashMap<String, String>> for MimeTable {
    fn from(map: HashMap<String, String>) -> Self {
        let mut table = MimeTable::new();
        for (ext, mime) in map {
            table.insert(&ext, mime);
        }
        table
    }
}

impl From<MimeTable> for HashMap<String, String> {
    fn from(table: MimeTable) -> Self {
        table.overrides
    }
}

impl MimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type for an extension (with or without the leading dot)
    pub fn insert(&mut self, ext: &str, mime: impl Into<String>) {
        self.overrides.insert(normalize_ext(ext), mime.into());
    }

    pub fn with(mut self, ext: &str, mime: impl Into<String>) -> Self {
        self.insert(ext, mime);
        self
    }

    /// MIME type for a path, falling back to [`DEFAULT_MIME`]
    pub fn lookup(&self, path: impl AsRef<Path>) -> String {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_ext);
        let Some(ext) = ext else {
            return DEFAULT_MIME.to_string();
        };
        if let Some(mime) = self.overrides.get(&ext) {
            return mime.clone();
        }
        mime_guess::from_ext(&ext)
            .first_raw()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_MIME.to_string())
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
