use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use photoprune::actions::DeleteError;
use photoprune::engine::{Engine, EngineError, Operation};
use photoprune::index::{AssetId, Fingerprint, FingerprintIndex, IndexStore};
use photoprune::library::{
    AssetDeleter, AssetRecord, AssetRepository, AuthorizationState, Authorizer, ImageEvent,
    ImageOutcome, ImageRequest, LibraryError,
};
use tempfile::TempDir;

use super::common::{Fixture, Pattern};

/// Repository whose listing calls block until released.
#[derive(Default)]
struct GatedRepository {
    entered: AtomicBool,
    released: AtomicBool,
}

impl GatedRepository {
    fn wait(&self) {
        self.entered.store(true, Ordering::SeqCst);
        while !self.released.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn wait_until_entered(&self) {
        while !self.entered.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl AssetRepository for GatedRepository {
    fn all_image_assets(&self) -> Result<Vec<AssetRecord>, LibraryError> {
        self.wait();
        Ok(Vec::new())
    }

    fn assets_with_ids(&self, _ids: &[AssetId]) -> Result<Vec<AssetRecord>, LibraryError> {
        self.wait();
        Ok(Vec::new())
    }

    fn request_image(&self, asset: &AssetRecord, _request: &ImageRequest) -> Vec<ImageEvent> {
        vec![ImageEvent::Failed(LibraryError::AssetNotFound(
            asset.id.clone(),
        ))]
    }

    fn resource_size(&self, _asset: &AssetRecord) -> Option<u64> {
        None
    }
}

struct NoopDeleter;

impl AssetDeleter for NoopDeleter {
    fn delete_assets(&self, _ids: &[AssetId]) -> Result<(), DeleteError> {
        Ok(())
    }
}

/// Authorizer with a fixed state and a scripted prompt answer.
struct ScriptedAuthorizer {
    state: Mutex<AuthorizationState>,
    answer: AuthorizationState,
    prompts: AtomicUsize,
}

impl ScriptedAuthorizer {
    fn new(state: AuthorizationState, answer: AuthorizationState) -> Self {
        Self {
            state: Mutex::new(state),
            answer,
            prompts: AtomicUsize::new(0),
        }
    }
}

impl Authorizer for ScriptedAuthorizer {
    fn authorization_state(&self) -> AuthorizationState {
        *self.state.lock().unwrap()
    }

    fn request_authorization(&self) -> AuthorizationState {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        *state = self.answer;
        *state
    }
}

fn gated_engine(
    repo: Arc<GatedRepository>,
    authorizer: Arc<ScriptedAuthorizer>,
    dir: &TempDir,
) -> Engine {
    Engine::new(
        repo,
        Arc::new(NoopDeleter),
        authorizer,
        IndexStore::new(dir.path().join("index.json")),
    )
}

fn authorized() -> Arc<ScriptedAuthorizer> {
    Arc::new(ScriptedAuthorizer::new(
        AuthorizationState::Authorized,
        AuthorizationState::Authorized,
    ))
}

#[test]
fn test_second_scan_is_rejected_while_running() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(GatedRepository::default());
    let engine = gated_engine(repo.clone(), authorized(), &dir);

    thread::scope(|s| {
        let first = s.spawn(|| engine.scan(None, None));
        repo.wait_until_entered();

        assert!(engine.is_scanning());
        let second = engine.scan(None, None);
        assert!(matches!(second, Err(EngineError::Busy(Operation::Scan))));

        repo.released.store(true, Ordering::SeqCst);
        let outcome = first.join().unwrap().unwrap();
        assert_eq!(outcome.total, 0);
    });

    assert!(!engine.is_scanning());
    assert!(engine.scan(None, None).is_ok());
}

#[test]
fn test_second_detection_is_rejected_while_running() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::new(dir.path().join("index.json"));
    store
        .save(&FingerprintIndex::new(vec![
            Fingerprint::new("a.jpg", Some(100.0), 10, 10, 7),
            Fingerprint::new("b.jpg", Some(110.0), 10, 10, 7),
        ]))
        .unwrap();

    let repo = Arc::new(GatedRepository::default());
    let engine = gated_engine(repo.clone(), authorized(), &dir);

    thread::scope(|s| {
        let first = s.spawn(|| engine.detect(None));
        repo.wait_until_entered();

        assert!(engine.is_detecting());
        let second = engine.detect(None);
        assert!(matches!(second, Err(EngineError::Busy(Operation::Detect))));
        assert_eq!(
            second.unwrap_err().user_message(),
            "Duplicate detection is already running."
        );

        repo.released.store(true, Ordering::SeqCst);
        let report = first.join().unwrap().unwrap();
        assert_eq!(report.groups.len(), 1);
        // Sizes were unavailable, so the resolution fallback applies.
        assert_eq!(report.total_estimated_bytes, 25);
    });

    assert!(!engine.is_detecting());
}

#[test]
fn test_denied_access_blocks_scan_without_prompt() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(ScriptedAuthorizer::new(
        AuthorizationState::Denied,
        AuthorizationState::Authorized,
    ));
    let repo = Arc::new(GatedRepository::default());
    repo.released.store(true, Ordering::SeqCst);
    let engine = gated_engine(repo.clone(), authorizer.clone(), &dir);

    let err = engine.scan(None, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unauthorized(AuthorizationState::Denied)
    ));
    assert_eq!(err.user_message(), "Photo access not authorized.");
    assert_eq!(authorizer.prompts.load(Ordering::SeqCst), 0);
    assert!(!repo.entered.load(Ordering::SeqCst));
    assert!(!engine.is_scanning());
}

#[test]
fn test_undetermined_access_prompts_once() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(ScriptedAuthorizer::new(
        AuthorizationState::NotDetermined,
        AuthorizationState::Limited,
    ));
    let repo = Arc::new(GatedRepository::default());
    repo.released.store(true, Ordering::SeqCst);
    let engine = gated_engine(repo, authorizer.clone(), &dir);

    assert!(engine.scan(None, None).is_ok());
    assert!(engine.scan(None, None).is_ok());
    assert_eq!(authorizer.prompts.load(Ordering::SeqCst), 1);
    assert_eq!(engine.authorization_state(), AuthorizationState::Limited);
}

#[test]
fn test_refused_prompt_blocks_months() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(ScriptedAuthorizer::new(
        AuthorizationState::NotDetermined,
        AuthorizationState::Restricted,
    ));
    let repo = Arc::new(GatedRepository::default());
    repo.released.store(true, Ordering::SeqCst);
    let engine = gated_engine(repo, authorizer, &dir);

    let err = engine.months(&chrono::Utc).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unauthorized(AuthorizationState::Restricted)
    ));
}

#[test]
fn test_missing_library_is_denied() {
    let fx = Fixture::new();
    let missing = fx.root().join("not-here");
    let library = photoprune::library::FsLibrary::new(&missing);
    let engine = Engine::new(
        Arc::new(library.clone()),
        Arc::new(NoopDeleter),
        Arc::new(library),
        IndexStore::new(fx.index_path()),
    );

    assert!(matches!(
        engine.scan(None, None),
        Err(EngineError::Unauthorized(AuthorizationState::Denied))
    ));
    assert!(!IndexStore::new(fx.index_path()).exists());
}

#[test]
fn test_thumbnail_outcomes() {
    let fx = Fixture::new();
    fx.photo("wide.png", 240, 120, Pattern::Rising);
    let engine = fx.engine().with_thumbnail_size(60);

    match engine.thumbnail(&AssetId::new("wide.png"), None).unwrap() {
        ImageOutcome::Delivered(img) => {
            assert_eq!(img.width(), 60);
            assert_eq!(img.height(), 30);
        }
        other => panic!("expected a thumbnail, got {:?}", other),
    }

    let cancel = Arc::new(AtomicBool::new(true));
    assert!(matches!(
        engine.thumbnail(&AssetId::new("wide.png"), Some(cancel)),
        Ok(ImageOutcome::Cancelled)
    ));

    assert!(matches!(
        engine.thumbnail(&AssetId::new("nope.png"), None),
        Err(EngineError::Library(LibraryError::AssetNotFound(_)))
    ));
}

#[test]
fn test_delete_assets_is_all_or_nothing() {
    let fx = Fixture::new();
    let keep = fx.photo("a.png", 16, 16, Pattern::Rising);
    let engine = fx.engine();

    let err = engine
        .delete_assets(&[AssetId::new("a.png"), AssetId::new("ghost.png")])
        .unwrap_err();
    assert!(matches!(err, EngineError::Deletion(DeleteError::NotFound(_))));
    assert!(keep.exists());

    let repeated = [AssetId::new("a.png"), AssetId::new("a.png")];
    assert_eq!(engine.delete_assets(&repeated).unwrap(), 1);
    assert!(!keep.exists());
    assert_eq!(std::fs::read_dir(fx.root()).unwrap().count(), 0);
}
