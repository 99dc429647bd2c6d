use std::fs;

use photoprune::engine::EngineError;
use photoprune::index::{IndexError, IndexStore};

use super::common::{Fixture, Pattern};

#[test]
fn test_detect_without_index_needs_scan() {
    let fx = Fixture::new();
    fx.photo("a.png", 32, 32, Pattern::Rising);

    let err = fx.engine().detect(None).unwrap_err();
    assert!(matches!(err, EngineError::Index(IndexError::NotFound(_))));
    assert!(err.needs_rescan());
    assert_eq!(
        err.user_message(),
        "No fingerprint index found. Run a scan first."
    );
}

#[test]
fn test_detect_rejects_outdated_index() {
    let fx = Fixture::new();
    fs::write(
        fx.index_path(),
        r#"{"formatVersion": 999, "generatedAt": "2024-01-01T00:00:00Z", "fingerprints": "whatever"}"#,
    )
    .unwrap();

    let err = fx.engine().detect(None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Index(IndexError::VersionMismatch { found: 999, .. })
    ));
    assert!(err.needs_rescan());
}

#[test]
fn test_detect_rejects_corrupt_index() {
    let fx = Fixture::new();
    fs::write(fx.index_path(), "{ not json").unwrap();

    let err = fx.engine().detect(None).unwrap_err();
    assert!(matches!(err, EngineError::Index(IndexError::Corrupt { .. })));
    assert_eq!(
        err.user_message(),
        "Fingerprint index is unreadable. Run a new scan."
    );
}

#[test]
fn test_identical_copies_form_one_group() {
    let fx = Fixture::new();
    let original = fx.photo("burst/1.png", 64, 48, Pattern::Falling);
    fs::copy(&original, fx.root().join("burst/2.png")).unwrap();
    fs::copy(&original, fx.root().join("burst/3.png")).unwrap();
    fx.photo("other.png", 64, 48, Pattern::Peak);

    let engine = fx.engine();
    engine.scan(None, None).unwrap();
    let report = engine.detect(None).unwrap();

    assert_eq!(report.fingerprint_count, 4);
    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.duplicate_count(), 2);
    assert!(group.is_well_formed());
    assert!(group
        .member_ids()
        .iter()
        .all(|id| id.as_str().starts_with("burst/")));
    assert_eq!(report.duplicate_count(), 2);
}

#[test]
fn test_estimates_use_file_sizes() {
    let fx = Fixture::new();
    let original = fx.photo("a.png", 64, 48, Pattern::Falling);
    let copy = fx.root().join("b.png");
    fs::copy(&original, &copy).unwrap();
    let file_size = fs::metadata(&copy).unwrap().len();

    let engine = fx.engine();
    engine.scan(None, None).unwrap();
    let report = engine.detect(None).unwrap();

    let group = &report.groups[0];
    let duplicate = &group.duplicates[0];
    assert_eq!(group.estimated_bytes_for(&duplicate.id), Some(file_size));
    assert_eq!(group.estimated_bytes, Some(file_size));
    assert_eq!(report.total_estimated_bytes, file_size);
}

#[test]
fn test_resized_copy_needs_dimension_override() {
    let fx = Fixture::new();
    fx.photo("full.png", 64, 48, Pattern::Rising);
    fx.photo("small.png", 32, 24, Pattern::Rising);

    let engine = fx.engine();
    engine.scan(None, None).unwrap();

    assert!(engine.detect(None).unwrap().is_empty());

    let report = engine.detect(Some(false)).unwrap();
    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.representative.id.as_str(), "full.png");
    assert_eq!(group.duplicates[0].id.as_str(), "small.png");
}

#[test]
fn test_distinct_photos_have_no_groups() {
    let fx = Fixture::new();
    fx.photo("a.png", 32, 32, Pattern::Rising);
    fx.photo("b.png", 32, 32, Pattern::Falling);
    fx.photo("c.png", 32, 32, Pattern::Peak);

    let engine = fx.engine();
    engine.scan(None, None).unwrap();
    let report = engine.detect(None).unwrap();

    assert!(report.is_empty());
    assert_eq!(report.fingerprint_count, 3);
    assert_eq!(report.total_estimated_bytes, 0);
}

#[test]
fn test_detection_is_stable_across_runs() {
    let fx = Fixture::new();
    let original = fx.photo("a.png", 40, 30, Pattern::Falling);
    fs::copy(&original, fx.root().join("b.png")).unwrap();
    fs::copy(&original, fx.root().join("c.png")).unwrap();

    let engine = fx.engine();
    engine.scan(None, None).unwrap();
    let first = engine.detect(None).unwrap();
    let second = engine.detect(None).unwrap();

    assert_eq!(first.groups[0].id, second.groups[0].id);
    assert_eq!(
        first.groups[0].representative.id,
        second.groups[0].representative.id
    );
}

#[test]
fn test_stale_fingerprints_fall_back_to_resolution_estimate() {
    let fx = Fixture::new();
    let original = fx.photo("a.png", 64, 48, Pattern::Falling);
    let copy = fx.root().join("b.png");
    fs::copy(&original, &copy).unwrap();

    let engine = fx.engine();
    engine.scan(None, None).unwrap();
    fs::remove_file(&copy).unwrap();
    fs::remove_file(&original).unwrap();

    // The index still lists both photos; neither file can be sized.
    let index = IndexStore::new(fx.index_path()).load().unwrap();
    assert_eq!(index.len(), 2);

    let report = engine.detect(None).unwrap();
    let group = &report.groups[0];
    let expected = (64.0 * 48.0 * 0.25) as u64;
    assert_eq!(group.estimated_bytes, Some(expected));
}
