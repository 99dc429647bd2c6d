use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use photoprune::index::IndexStore;
use photoprune::scanner::ScanConfig;

use super::common::{Fixture, Pattern};

#[test]
fn test_scan_empty_library() {
    let fx = Fixture::new();
    let outcome = fx.engine().scan(None, None).unwrap();

    assert_eq!(outcome.total, 0);
    assert_eq!(outcome.indexed_total(), 0);
    assert!(!outcome.cancelled);

    let index = IndexStore::new(fx.index_path()).load().unwrap();
    assert!(index.is_empty());
}

#[test]
fn test_scan_writes_fingerprints_in_enumeration_order() {
    let fx = Fixture::new();
    fx.photo("a.png", 64, 48, Pattern::Rising);
    fx.photo("nested/b.png", 64, 48, Pattern::Falling);
    fx.photo("nested/deeper/c.png", 32, 32, Pattern::Peak);
    fs::write(fx.root().join("notes.txt"), "not a photo").unwrap();

    let outcome = fx.engine().scan(None, None).unwrap();
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.indexed, 3);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.index_path, fx.index_path());

    let index = IndexStore::new(fx.index_path()).load().unwrap();
    let ids: Vec<&str> = index.fingerprints.iter().map(|f| f.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(sorted, vec!["a.png", "nested/b.png", "nested/deeper/c.png"]);

    let rising = index
        .fingerprints
        .iter()
        .find(|f| f.id.as_str() == "a.png")
        .unwrap();
    assert_eq!(rising.dimensions(), (64, 48));
    assert_eq!(rising.hash, 0);
    assert!(rising.creation_time.is_some());

    let falling = index
        .fingerprints
        .iter()
        .find(|f| f.id.as_str() == "nested/b.png")
        .unwrap();
    assert_ne!(falling.hash, rising.hash);
}

#[test]
fn test_unreadable_image_is_skipped() {
    let fx = Fixture::new();
    fx.photo("good.png", 32, 32, Pattern::Rising);
    fs::write(fx.root().join("broken.png"), b"definitely not a png").unwrap();

    let outcome = fx.engine().scan(None, None).unwrap();
    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.indexed, 1);
    assert_eq!(outcome.skipped, 1);
    assert!(outcome.is_partial());

    let index = IndexStore::new(fx.index_path()).load().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.fingerprints[0].id.as_str(), "good.png");
}

#[test]
fn test_rescan_reuses_unchanged_fingerprints() {
    let fx = Fixture::new();
    fx.photo("a.png", 32, 32, Pattern::Rising);
    fx.photo("b.png", 32, 32, Pattern::Falling);

    let engine = fx.engine();
    assert_eq!(engine.scan(None, None).unwrap().indexed, 2);

    fx.photo("c.png", 32, 32, Pattern::Peak);
    let second = engine.scan(None, None).unwrap();
    assert_eq!(second.reused, 2);
    assert_eq!(second.indexed, 1);
    assert_eq!(second.indexed_total(), 3);
}

#[test]
fn test_rescan_rehashes_photo_edited_in_place() {
    let fx = Fixture::new();
    let path = fx.photo("a.png", 32, 32, Pattern::Rising);
    let engine = fx.engine();
    engine.scan(None, None).unwrap();
    let before = IndexStore::new(fx.index_path()).load().unwrap();
    assert_eq!(before.fingerprints[0].hash, 0);

    // Same path and dimensions, different content.
    fx.photo("a.png", 32, 32, Pattern::Falling);
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(3_600))
        .unwrap();

    let outcome = engine.scan(None, None).unwrap();
    assert_eq!(outcome.reused, 0);
    assert_eq!(outcome.indexed, 1);

    let after = IndexStore::new(fx.index_path()).load().unwrap();
    assert_eq!(after.fingerprints[0].hash, u64::MAX);
}

#[test]
fn test_full_rescan_hashes_everything() {
    let fx = Fixture::new();
    fx.photo("a.png", 32, 32, Pattern::Rising);
    fx.photo("b.png", 32, 32, Pattern::Falling);
    fx.engine().scan(None, None).unwrap();

    let engine = fx
        .engine()
        .with_scan_config(ScanConfig::default().with_reuse_existing(false));
    let outcome = engine.scan(None, None).unwrap();
    assert_eq!(outcome.reused, 0);
    assert_eq!(outcome.indexed, 2);
}

#[test]
fn test_cancelled_scan_keeps_previous_fingerprints() {
    let fx = Fixture::new();
    fx.photo("a.png", 32, 32, Pattern::Rising);
    fx.photo("b.png", 32, 32, Pattern::Falling);
    fx.engine().scan(None, None).unwrap();

    let cancel = Arc::new(AtomicBool::new(true));
    let outcome = fx.engine().scan(Some(cancel), None).unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.indexed, 0);

    let index = IndexStore::new(fx.index_path()).load().unwrap();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_deleted_photo_leaves_the_index() {
    let fx = Fixture::new();
    fx.photo("a.png", 32, 32, Pattern::Rising);
    let doomed = fx.photo("b.png", 32, 32, Pattern::Falling);
    let engine = fx.engine();
    engine.scan(None, None).unwrap();

    fs::remove_file(doomed).unwrap();
    let outcome = engine.scan(None, None).unwrap();
    assert_eq!(outcome.total, 1);

    let index = IndexStore::new(fx.index_path()).load().unwrap();
    assert_eq!(index.len(), 1);
}
