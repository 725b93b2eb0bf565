//! File handle implementations

use super::File;
use crate::core::catalog::Metadata;
use crate::error::{ImbedError, Result};
use bytes::Bytes;
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};

fn ensure_open(closed: bool) -> Result<()> {
    if closed {
        Err(ImbedError::AlreadyClosed)
    } else {
        Ok(())
    }
}

/// Paging cursor over a sorted directory listing
#[derive(Debug, Clone, Default)]
pub(crate) struct DirCursor {
    entries: Vec<Metadata>,
    pos: usize,
}

impl DirCursor {
    pub(crate) fn new(mut entries: Vec<Metadata>) -> Self {
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        DirCursor { entries, pos: 0 }
    }

    /// Listing in the given order, without re-sorting
    pub(crate) fn ordered(entries: Vec<Metadata>) -> Self {
        DirCursor { entries, pos: 0 }
    }

    fn next(&mut self, count: isize) -> Result<Vec<Metadata>> {
        let remaining = self.entries.len() - self.pos;
        if count <= 0 {
            let rest = self.entries[self.pos..].to_vec();
            self.pos = self.entries.len();
            return Ok(rest);
        }
        if remaining == 0 {
            return Err(ImbedError::Eof);
        }
        let n = remaining.min(count as usize);
        let page = self.entries[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(page)
    }
}

/// Open directory
#[derive(Debug)]
pub struct DirectoryFile {
    meta: Metadata,
    cursor: DirCursor,
    closed: bool,
}

impl DirectoryFile {
    pub(crate) fn new(meta: Metadata, cursor: DirCursor) -> Self {
        DirectoryFile {
            meta,
            cursor,
            closed: false,
        }
    }
}

impl File for DirectoryFile {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        ensure_open(self.closed)?;
        Ok(0)
    }

    fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        ensure_open(self.closed)?;
        Err(ImbedError::InvalidOperation("seek on a directory"))
    }

    fn readdir(&mut self, count: isize) -> Result<Vec<Metadata>> {
        ensure_open(self.closed)?;
        self.cursor.next(count)
    }

    fn stat(&self) -> Result<Metadata> {
        ensure_open(self.closed)?;
        Ok(self.meta.clone())
    }

    fn close(&mut self) -> Result<()> {
        ensure_open(self.closed)?;
        self.closed = true;
        Ok(())
    }
}

/// Packed file read directly from its stored bytes
///
/// Used for uncompressed assets and for compressed assets opened raw.
#[derive(Debug)]
pub struct RegularFile {
    meta: Metadata,
    data: Cursor<Bytes>,
    closed: bool,
}

impl RegularFile {
    pub(crate) fn new(meta: Metadata, stored: Bytes) -> Self {
        RegularFile {
            meta,
            data: Cursor::new(stored),
            closed: false,
        }
    }
}

impl File for RegularFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        ensure_open(self.closed)?;
        Ok(self.data.read(buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        ensure_open(self.closed)?;
        Ok(self.data.seek(pos)?)
    }

    fn readdir(&mut self, _count: isize) -> Result<Vec<Metadata>> {
        ensure_open(self.closed)?;
        Err(ImbedError::InvalidOperation("readdir on a file"))
    }

    fn stat(&self) -> Result<Metadata> {
        ensure_open(self.closed)?;
        Ok(self.meta.clone())
    }

    fn close(&mut self) -> Result<()> {
        ensure_open(self.closed)?;
        self.closed = true;
        Ok(())
    }
}

/// Compressed asset exposed as its decompressed content
///
/// Forward-only: the decoder cannot seek.
pub struct CompressedFile {
    meta: Metadata,
    reader: Box<dyn Read + Send>,
    closed: bool,
}

impl CompressedFile {
    pub(crate) fn new(meta: Metadata, reader: Box<dyn Read + Send>) -> Self {
        CompressedFile {
            meta,
            reader,
            closed: false,
        }
    }
}

impl File for CompressedFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        ensure_open(self.closed)?;
        Ok(self.reader.read(buf)?)
    }

    fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        ensure_open(self.closed)?;
        Err(ImbedError::InvalidOperation("seek on a compressed stream"))
    }

    fn readdir(&mut self, _count: isize) -> Result<Vec<Metadata>> {
        ensure_open(self.closed)?;
        Err(ImbedError::InvalidOperation("readdir on a file"))
    }

    fn stat(&self) -> Result<Metadata> {
        ensure_open(self.closed)?;
        Ok(self.meta.clone())
    }

    fn close(&mut self) -> Result<()> {
        ensure_open(self.closed)?;
        self.closed = true;
        Ok(())
    }
}

/// Regular file on the live filesystem
#[derive(Debug)]
pub struct LiveFile {
    meta: Metadata,
    file: fs::File,
    closed: bool,
}

impl LiveFile {
    pub(crate) fn new(meta: Metadata, file: fs::File) -> Self {
        LiveFile {
            meta,
            file,
            closed: false,
        }
    }
}

impl File for LiveFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        ensure_open(self.closed)?;
        Ok(self.file.read(buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        ensure_open(self.closed)?;
        Ok(self.file.seek(pos)?)
    }

    fn readdir(&mut self, _count: isize) -> Result<Vec<Metadata>> {
        ensure_open(self.closed)?;
        Err(ImbedError::InvalidOperation("readdir on a file"))
    }

    fn stat(&self) -> Result<Metadata> {
        ensure_open(self.closed)?;
        Ok(self.meta.clone())
    }

    fn close(&mut self) -> Result<()> {
        ensure_open(self.closed)?;
        self.closed = true;
        Ok(())
    }
}
