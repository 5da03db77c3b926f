use nascatalog::cache::PathHash;
use nascatalog::scanner::path_utils::{depth_of, logical_segments, path_hash, path_key, relative_path, resolve_path};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_resolve_matches_nfd_on_disk() {
    let dir = tempdir().unwrap();
    // "Café" stored decomposed, as some NAS shares do.
    let on_disk = dir.path().join("Cafe\u{0301}");
    fs::create_dir(&on_disk).unwrap();
    fs::create_dir(on_disk.join("Vol 1")).unwrap();

    let resolved = resolve_path(dir.path(), "caf\u{e9}/vol 1");
    assert_eq!(resolved, on_disk.join("Vol 1"));
    assert!(resolved.exists());
}

#[test]
fn test_resolve_percent_encoded_segments() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("One Piece/Vol 01")).unwrap();

    let resolved = resolve_path(dir.path(), "One%20Piece/Vol%2001");
    assert_eq!(resolved, dir.path().join("One Piece/Vol 01"));
}

#[test]
fn test_resolve_missing_segment_is_literal() {
    let dir = tempdir().unwrap();
    let resolved = resolve_path(dir.path(), "missing/child");
    assert_eq!(resolved, dir.path().join("missing").join("child"));
    assert!(!resolved.exists());
}

#[test]
fn test_empty_and_dot_segments_dropped() {
    assert_eq!(logical_segments("/a//./b/"), vec!["a", "b"]);
    assert_eq!(logical_segments("a\\b"), vec!["a", "b"]);
    assert!(logical_segments("").is_empty());
}

#[test]
fn test_hash_equal_for_equivalent_paths() {
    let dir = tempdir().unwrap();
    let nfd = dir.path().join("Cafe\u{0301}");
    let nfc = dir.path().join("Caf\u{e9}");
    assert_eq!(path_key(&nfd), path_key(&nfc));
    assert_eq!(PathHash::of(&nfd), PathHash::of(&nfc));
    assert_eq!(path_hash(&nfc), PathHash::of(&nfd));
    assert_eq!(PathHash::of(&nfc).as_str().len(), 32);
}

#[test]
fn test_relative_path_and_depth() {
    let dir = tempdir().unwrap();
    let abs = dir.path().join("Manga").join("Berserk");
    let rel = relative_path(dir.path(), &abs);
    assert_eq!(rel, "Manga/Berserk");
    assert_eq!(depth_of(&rel), 2);
    assert_eq!(relative_path(dir.path(), dir.path()), "");
    assert_eq!(depth_of(""), 0);
}
