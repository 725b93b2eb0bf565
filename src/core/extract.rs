//! Extraction of a filesystem tree onto local disk

use crate::core::catalog::Metadata;
use crate::core::path::clean_path;
use crate::core::vfs::{FileSystem, WalkControl};
use crate::error::{ImbedError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Permission bits for extracted files and directories
///
/// Directories get the file bits plus execute wherever read is granted, so
/// `0o640` yields `0o750` directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractMode {
    file: u32,
    dir: u32,
}

impl ExtractMode {
    pub fn new(mode: u32) -> Self {
        let file = mode & 0o777;
        ExtractMode {
            file,
            dir: file | ((file & 0o444) >> 2),
        }
    }

    pub fn file(&self) -> u32 {
        self.file
    }

    pub fn dir(&self) -> u32 {
        self.dir
    }
}

impl Default for ExtractMode {
    fn default() -> Self {
        ExtractMode::new(0o640)
    }
}

/// Extract `paths` (the whole tree when empty) under `target`
///
/// Existing directories are merged into. An existing file is left alone when
/// its size and modification time match the packed entry; otherwise it is an
/// error unless `overwrite` is set. Files are written to a temporary file in
/// the destination directory and renamed into place. The first error stops
/// the extraction; files already written stay.
pub fn copy_to<F, P>(fs: &F, target: P, mode: u32, overwrite: bool, paths: &[&str]) -> Result<()>
where
    F: FileSystem + ?Sized,
    P: AsRef<Path>,
{
    let target = target.as_ref();
    let mode = ExtractMode::new(mode);
    let roots: Vec<String> = if paths.is_empty() {
        vec![String::new()]
    } else {
        paths.iter().map(|p| clean_path(p)).collect()
    };

    let mut written = 0usize;
    for root in &roots {
        fs.walk(root, &mut |path: &str, meta: &Metadata, err: Option<ImbedError>| {
            if let Some(err) = err {
                return Err(err);
            }
            if extract_entry(fs, target, path, meta, mode, overwrite)? {
                written += 1;
            }
            Ok(WalkControl::Continue)
        })?;
    }
    info!("Extracted {} files to {:?}", written, target);
    Ok(())
}

/// Materialize one entry; returns whether a file was written
fn extract_entry<F: FileSystem + ?Sized>(
    fs: &F,
    target: &Path,
    path: &str,
    meta: &Metadata,
    mode: ExtractMode,
    overwrite: bool,
) -> Result<bool> {
    let dest = local_path(target, path);

    match fs::metadata(&dest) {
        Ok(existing) => {
            if existing.is_dir() != meta.is_dir() {
                return Err(ImbedError::TypeMismatch(dest));
            }
            if meta.is_dir() {
                return Ok(false);
            }
            if !overwrite {
                let same_size = existing.len() == meta.size();
                let same_time = existing.modified().ok() == Some(meta.modified());
                if same_size && same_time {
                    debug!("Skipping unchanged {:?}", dest);
                    return Ok(false);
                }
                return Err(ImbedError::AlreadyExists(dest));
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if meta.is_dir() {
        create_dirs(&dest, mode)?;
        return Ok(false);
    }

    let dir = dest.parent().unwrap_or(target);
    create_dirs(dir, mode)?;

    let mut tmp = NamedTempFile::with_prefix_in(".imbed", dir)?;
    let mut src = fs.open(path)?;
    io::copy(&mut *src, tmp.as_file_mut())?;
    src.close()?;

    let file = tmp.as_file();
    file.set_modified(meta.modified())?;
    set_file_mode(file, mode.file())?;
    tmp.persist(&dest).map_err(|e| ImbedError::Io(e.error))?;
    debug!("Extracted {:?} ({} bytes)", dest, meta.size());
    Ok(true)
}

fn local_path(target: &Path, path: &str) -> PathBuf {
    let mut dest = target.to_path_buf();
    if !path.is_empty() {
        dest.extend(path.split('/'));
    }
    dest
}

#[cfg(unix)]
fn create_dirs(dir: &Path, mode: ExtractMode) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode.dir())
        .create(dir)
}

#[cfg(not(unix))]
fn create_dirs(dir: &Path, _mode: ExtractMode) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_file_mode(file: &fs::File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(file: &fs::File, mode: u32) -> io::Result<()> {
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(mode & 0o222 == 0);
    file.set_permissions(perms)
}
