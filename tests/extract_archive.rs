//! Archive round trips and extraction onto disk

use imbed_rs::{archive, copy_to, pack, FileSystem, ImbedError, PackOptions};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn source_tree() -> TempDir {
    let src = TempDir::new().unwrap();
    let root = src.path();
    fs::create_dir_all(root.join("assets/js")).unwrap();
    fs::create_dir_all(root.join("assets/empty")).unwrap();
    fs::write(root.join("index.html"), b"<!doctype html><p>home</p>").unwrap();
    fs::write(root.join("assets/js/app.js"), b"console.log(1);\n".repeat(50)).unwrap();
    fs::write(root.join("assets/font.woff2"), (0u8..=255).collect::<Vec<_>>()).unwrap();
    src
}

/// Relative path → content of every regular file under `root`
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap();
            let key = rel.to_string_lossy().replace('\\', "/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_archive_then_extract_reproduces_tree() {
    let src = source_tree();
    let (blob, index) = pack(src.path(), &PackOptions::default()).unwrap();

    let work = TempDir::new().unwrap();
    let path = work.path().join("site.imbd");
    archive::write(&path, &index, &blob).unwrap();

    let fs_ = archive::open(&path).unwrap();
    let out = work.path().join("out");
    copy_to(&fs_, &out, 0o644, false, &[]).unwrap();

    assert_eq!(snapshot(&out), snapshot(src.path()));
    assert!(out.join("assets/empty").is_dir());
}

#[cfg(unix)]
#[test]
fn test_second_extraction_writes_nothing() {
    use std::os::unix::fs::MetadataExt;

    let src = source_tree();
    let (blob, index) = pack(src.path(), &PackOptions::default()).unwrap();
    let fs_ = imbed_rs::EmbeddedFs::new(index, blob);

    let out = TempDir::new().unwrap();
    copy_to(&fs_, out.path(), 0o640, false, &[]).unwrap();
    let inodes = |p: &Path| -> BTreeMap<String, u64> {
        snapshot(p)
            .into_keys()
            .map(|k| {
                let ino = fs::metadata(p.join(&k)).unwrap().ino();
                (k, ino)
            })
            .collect()
    };
    let before = inodes(out.path());

    copy_to(&fs_, out.path(), 0o640, false, &[]).unwrap();
    // files written again would have been renamed into place under a new inode
    assert_eq!(inodes(out.path()), before);
}

#[test]
fn test_overwrite_replaces_modified_file() {
    let src = source_tree();
    let (blob, index) = pack(src.path(), &PackOptions::default()).unwrap();
    let fs_ = imbed_rs::EmbeddedFs::new(index, blob);

    let out = TempDir::new().unwrap();
    copy_to(&fs_, out.path(), 0o640, false, &[]).unwrap();
    fs::write(out.path().join("index.html"), b"local change").unwrap();

    assert!(matches!(
        copy_to(&fs_, out.path(), 0o640, false, &["index.html"]),
        Err(ImbedError::AlreadyExists(_))
    ));
    copy_to(&fs_, out.path(), 0o640, true, &["index.html"]).unwrap();
    assert_eq!(
        fs::read(out.path().join("index.html")).unwrap(),
        b"<!doctype html><p>home</p>"
    );
}

#[test]
fn test_extract_through_overlay() {
    let src = source_tree();
    let (blob, index) = pack(src.path(), &PackOptions::default()).unwrap();
    let live = TempDir::new().unwrap();
    fs::write(live.path().join("index.html"), b"live").unwrap();
    let overlay = imbed_rs::EmbeddedFs::new(index, blob)
        .overlayed_with(live.path())
        .unwrap();
    assert_eq!(overlay.stat("index.html").unwrap().size(), 4);

    let out = TempDir::new().unwrap();
    copy_to(&overlay, out.path(), 0o640, false, &[]).unwrap();
    assert_eq!(fs::read(out.path().join("index.html")).unwrap(), b"live");
    assert!(out.path().join("assets/js/app.js").is_file());
}

#[test]
fn test_corrupt_archive_rejected() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("bogus.imbd");
    fs::write(&path, vec![0u8; 128]).unwrap();
    assert!(matches!(archive::open(&path), Err(ImbedError::InvalidMagic)));
}
