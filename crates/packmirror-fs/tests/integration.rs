use packmirror_fs::{AtomicWriteOptions, Error, atomic_read, atomic_write, ensure_dir, read_if_exists};
use tempfile::tempdir;

#[test]
fn test_atomic_write_basic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("404.json");

    atomic_write(&path, b"{\"acme/gone\":true}", AtomicWriteOptions::new()).unwrap();

    assert!(path.exists());
    assert_eq!(atomic_read(&path).unwrap(), b"{\"acme/gone\":true}");
}

#[test]
fn test_atomic_write_replaces_existing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.json");

    std::fs::write(&path, "original").unwrap();
    atomic_write(&path, b"new content", AtomicWriteOptions::new()).unwrap();

    assert_eq!(atomic_read(&path).unwrap(), b"new content");
}

#[test]
fn test_atomic_write_creates_missing_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p2").join("acme").join("widget.json");

    atomic_write(&path, b"{}", AtomicWriteOptions::new()).unwrap();

    assert_eq!(atomic_read(&path).unwrap(), b"{}");
}

#[test]
fn test_read_if_exists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dist.json");

    assert!(read_if_exists(&path).unwrap().is_none());

    std::fs::write(&path, "{}").unwrap();
    assert_eq!(read_if_exists(&path).unwrap().as_deref(), Some(&b"{}"[..]));
}

#[test]
fn test_atomic_read_missing_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.json");

    let err = atomic_read(&path).unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
    assert_eq!(err.path(), path.as_path());
}

#[test]
fn test_ensure_dir_is_idempotent() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");

    ensure_dir(&nested).unwrap();
    ensure_dir(&nested).unwrap();

    assert!(nested.is_dir());
}
