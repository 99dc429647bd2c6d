use std::io::Cursor;

use chrono::Utc;
use photoprune::actions::{DeleteConfig, TrashDeleter};
use photoprune::library::FsLibrary;
use photoprune::triage::{run_triage, CommitOutcome, Decision, TriageState, UNKNOWN_MONTH_KEY};

use super::common::{Fixture, Pattern};

fn three_photo_fixture() -> Fixture {
    let fx = Fixture::new();
    fx.photo("a.png", 16, 16, Pattern::Rising);
    fx.photo("b.png", 16, 16, Pattern::Falling);
    fx.photo("c.png", 16, 16, Pattern::Peak);
    fx
}

#[test]
fn test_recent_photos_land_in_current_month() {
    let fx = three_photo_fixture();
    let catalog = fx.engine().months(&Utc).unwrap();

    let summaries = catalog.summaries();
    assert_eq!(summaries.len(), 1);
    let month = &summaries[0];
    assert_eq!(month.key, Utc::now().format("%Y-%m").to_string());
    assert_ne!(month.key, UNKNOWN_MONTH_KEY);
    assert_eq!(month.total_count, 3);
    assert_eq!(month.pending_deletion_count, 0);
}

#[test]
fn test_unknown_month_has_no_session() {
    let fx = three_photo_fixture();
    let engine = fx.engine();
    let catalog = engine.months(&Utc).unwrap();
    assert!(engine.triage_session(&catalog, "1999-01").is_none());
}

#[test]
fn test_session_commit_deletes_marked_photos() {
    let fx = three_photo_fixture();
    let engine = fx.engine();
    let catalog = engine.months(&Utc).unwrap();
    let key = catalog.months()[0].key.clone();

    let mut session = engine.triage_session(&catalog, &key).unwrap();
    assert!(session.state().is_reviewing());

    let first = session.current().unwrap().id.clone();
    session.decide(Decision::Delete);
    session.decide(Decision::Keep);
    assert_eq!(session.pending_deletion_count(), 1);

    let outcome = engine.commit(&mut session);
    assert!(matches!(outcome, CommitOutcome::Deleted { count: 1 }));
    assert_eq!(outcome.message(), "Deleted 1 photos.");
    assert!(!fx.root().join(first.as_str()).exists());

    assert_eq!(session.month().len(), 2);
    assert_eq!(session.pending_deletion_count(), 0);
    assert_eq!(session.undecided_count(), 1);
    assert!(session.state().is_reviewing());
}

#[test]
fn test_failed_commit_keeps_marks() {
    let fx = three_photo_fixture();
    let engine = fx.engine();
    let catalog = engine.months(&Utc).unwrap();
    let key = catalog.months()[0].key.clone();
    let mut session = engine.triage_session(&catalog, &key).unwrap();

    let doomed = session.current().unwrap().id.clone();
    session.decide(Decision::Delete);
    // The file vanishes behind the session's back; the batch must fail whole.
    std::fs::remove_file(fx.root().join(doomed.as_str())).unwrap();

    let outcome = engine.commit(&mut session);
    assert!(matches!(outcome, CommitOutcome::Failed(_)));
    assert!(outcome.message().starts_with("Deletion failed: "));
    assert_eq!(session.pending_deletion_count(), 1);
    assert_eq!(session.decision_for(&doomed), Some(Decision::Delete));
    assert_eq!(session.month().len(), 3);
}

#[test]
fn test_review_loop_over_real_library() {
    let fx = three_photo_fixture();
    let engine = fx.engine();
    let catalog = engine.months(&Utc).unwrap();
    let key = catalog.months()[0].key.clone();
    let mut session = engine.triage_session(&catalog, &key).unwrap();

    let deleter = TrashDeleter::new(FsLibrary::new(fx.root()), DeleteConfig::permanent());
    let mut output = Vec::new();
    let report = run_triage(
        &mut session,
        &deleter,
        Cursor::new("d\nd\nu\nk\nk\nc\nq\n"),
        &mut output,
    )
    .unwrap();

    assert_eq!(report.decisions, 3);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.pending, 0);
    assert_eq!(session.state(), TriageState::Exhausted);

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("Deleted 1 photos."));

    let catalog = fx.engine().months(&Utc).unwrap();
    assert_eq!(catalog.months()[0].len(), 2);
}

#[test]
fn test_month_catalog_tracks_pending_marks() {
    let fx = three_photo_fixture();
    let engine = fx.engine();
    let mut catalog = engine.months(&Utc).unwrap();
    let key = catalog.months()[0].key.clone();
    let mut session = engine.triage_session(&catalog, &key).unwrap();

    session.decide(Decision::Delete);
    session.decide(Decision::Delete);
    catalog.update_pending(&key, session.pending_deletion_count());

    let summary = catalog
        .summaries()
        .into_iter()
        .find(|s| s.key == key)
        .unwrap();
    assert_eq!(summary.pending_deletion_count, 2);
}
