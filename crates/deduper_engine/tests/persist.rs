use std::fs;

use deduper_engine::{write_atomic, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_directories_and_replaces_content() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested").join("snapshot.ron");

    write_atomic(&target, "first").unwrap();
    write_atomic(&target, "second").unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "second");
    // No temp files are left behind next to the snapshot.
    let entries = fs::read_dir(target.parent().unwrap()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn parent_that_is_a_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x").unwrap();

    let err = write_atomic(&blocker.join("snapshot.ron"), "data").unwrap_err();
    assert!(matches!(err, PersistError::NotADirectory(path) if path == blocker));
}
