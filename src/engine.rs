//! Orchestration of scan, detection, review and deletion.
//!
//! # Overview
//!
//! [`Engine`] wires the library collaborators to the pipeline:
//!
//! 1. **Scan**: authorization check, fingerprint every asset, write the index
//! 2. **Detect**: load the index, cluster exact duplicates, estimate savings
//! 3. **Review**: partition the library into months for triage sessions
//! 4. **Delete**: hand confirmed assets to the deleter
//!
//! Scan and detection are single-flight: a second call while one is running
//! fails with [`EngineError::Busy`] instead of queueing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use photoprune::actions::{DeleteConfig, TrashDeleter};
//! use photoprune::engine::Engine;
//! use photoprune::index::IndexStore;
//! use photoprune::library::FsLibrary;
//!
//! let library = FsLibrary::new("/photos");
//! let engine = Engine::new(
//!     Arc::new(library.clone()),
//!     Arc::new(TrashDeleter::new(library.clone(), DeleteConfig::trash())),
//!     Arc::new(library),
//!     IndexStore::new("/tmp/photo_fingerprints.json"),
//! );
//!
//! engine.scan(None, None).unwrap();
//! let report = engine.detect(None).unwrap();
//! println!("{} duplicate groups", report.groups.len());
//! ```

use std::collections::HashSet;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::actions::delete::DeleteError;
use crate::duplicates::{
    total_estimated_bytes, DetectorConfig, DuplicateDetector, DuplicateGroup, EstimateError,
    StorageEstimator,
};
use crate::index::{AssetId, IndexError, IndexStore};
use crate::library::{
    AssetDeleter, AssetRepository, AuthorizationState, Authorizer, ImageOutcome, ImageRequest,
    LibraryError,
};
use crate::progress::ProgressCallback;
use crate::scanner::{ScanConfig, ScanError, ScanOutcome, Scanner};
use crate::triage::{CommitOutcome, MonthCatalog, SwipeAsset, TriageSession};

/// Default edge length of review thumbnails.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 120;

/// Operations guarded against concurrent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Library scan
    Scan,
    /// Duplicate detection
    Detect,
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => write!(f, "scan"),
            Self::Detect => write!(f, "duplicate detection"),
        }
    }
}

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation is already running.
    #[error("a {0} is already running")]
    Busy(Operation),

    /// Library access is insufficient.
    #[error("photo library access is {0}")]
    Unauthorized(AuthorizationState),

    /// The fingerprint index could not be used.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The library could not be read.
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// Deleting assets failed.
    #[error(transparent)]
    Deletion(#[from] DeleteError),

    /// Storage estimation rejected its input.
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

impl From<ScanError> for EngineError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Library(e) => Self::Library(e),
            ScanError::Index(e) => Self::Index(e),
        }
    }
}

impl EngineError {
    /// Text suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Busy(Operation::Scan) => "A scan is already running.".to_string(),
            Self::Busy(Operation::Detect) => "Duplicate detection is already running.".to_string(),
            Self::Unauthorized(_) => "Photo access not authorized.".to_string(),
            Self::Index(IndexError::NotFound(_)) => {
                "No fingerprint index found. Run a scan first.".to_string()
            }
            Self::Index(IndexError::VersionMismatch { .. }) => {
                "Fingerprint index is outdated. Run a new scan.".to_string()
            }
            Self::Index(IndexError::Corrupt { .. }) => {
                "Fingerprint index is unreadable. Run a new scan.".to_string()
            }
            Self::Index(e) => format!("Fingerprint index error: {}", e),
            Self::Library(e) => format!("Could not read the photo library: {}", e),
            Self::Deletion(e) => format!("Deletion failed: {}", e),
            Self::Estimate(e) => format!("Could not estimate storage: {}", e),
        }
    }

    /// Check if a new scan would resolve this error.
    #[must_use]
    pub fn needs_rescan(&self) -> bool {
        matches!(
            self,
            Self::Index(
                IndexError::NotFound(_)
                    | IndexError::VersionMismatch { .. }
                    | IndexError::Corrupt { .. }
            )
        )
    }
}

/// Result of a detection pass.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// When the index was produced
    pub index_generated_at: DateTime<Utc>,
    /// Fingerprints examined
    pub fingerprint_count: usize,
    /// Duplicate groups with estimates
    pub groups: Vec<DuplicateGroup>,
    /// Sum of all group estimates
    pub total_estimated_bytes: u64,
}

impl DetectionReport {
    /// Number of deletion candidates across all groups.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::duplicate_count).sum()
    }

    /// Check if no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Marks an operation as running until dropped.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, operation: Operation) -> Result<Self, EngineError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EngineError::Busy(operation))?;
        Ok(Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Duplicate detection and triage over a photo library.
pub struct Engine {
    repository: Arc<dyn AssetRepository>,
    deleter: Arc<dyn AssetDeleter>,
    authorizer: Arc<dyn Authorizer>,
    store: IndexStore,
    detector: DuplicateDetector,
    estimator: StorageEstimator,
    scan_config: ScanConfig,
    thumbnail_size: u32,
    scanning: AtomicBool,
    detecting: AtomicBool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("detector", &self.detector)
            .field("estimator", &self.estimator)
            .field("scan_config", &self.scan_config)
            .field("thumbnail_size", &self.thumbnail_size)
            .field("scanning", &self.scanning)
            .field("detecting", &self.detecting)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine with default settings.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AssetRepository>,
        deleter: Arc<dyn AssetDeleter>,
        authorizer: Arc<dyn Authorizer>,
        store: IndexStore,
    ) -> Self {
        Self {
            repository,
            deleter,
            authorizer,
            store,
            detector: DuplicateDetector::default(),
            estimator: StorageEstimator::default(),
            scan_config: ScanConfig::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            scanning: AtomicBool::new(false),
            detecting: AtomicBool::new(false),
        }
    }

    /// Set the clustering configuration.
    #[must_use]
    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector = DuplicateDetector::new(config);
        self
    }

    /// Set the storage estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: StorageEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Set the base scan configuration.
    #[must_use]
    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Set the review thumbnail size.
    #[must_use]
    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size.max(1);
        self
    }

    /// The index store.
    #[must_use]
    pub fn index_store(&self) -> &IndexStore {
        &self.store
    }

    /// Check if a scan is running.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Check if detection is running.
    #[must_use]
    pub fn is_detecting(&self) -> bool {
        self.detecting.load(Ordering::Acquire)
    }

    /// Current library access level.
    #[must_use]
    pub fn authorization_state(&self) -> AuthorizationState {
        self.authorizer.authorization_state()
    }

    /// Ask for library access.
    pub fn request_authorization(&self) -> AuthorizationState {
        self.authorizer.request_authorization()
    }

    /// Resolve access, prompting once if undetermined.
    fn ensure_authorized(&self) -> Result<(), EngineError> {
        let mut state = self.authorizer.authorization_state();
        if state == AuthorizationState::NotDetermined {
            state = self.authorizer.request_authorization();
        }
        if state.allows_scan() {
            Ok(())
        } else {
            log::warn!("Library access {}", state);
            Err(EngineError::Unauthorized(state))
        }
    }

    /// Fingerprint the library and write the index.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::Busy`] while another scan runs,
    /// [`EngineError::Unauthorized`] without library access, and otherwise
    /// with library or index errors. Cancellation is reported in the outcome.
    pub fn scan(
        &self,
        cancel: Option<Arc<AtomicBool>>,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<ScanOutcome, EngineError> {
        let _guard = FlightGuard::acquire(&self.scanning, Operation::Scan)?;
        self.ensure_authorized()?;

        let mut config = self.scan_config.clone();
        if let Some(flag) = cancel {
            config = config.with_shutdown_flag(flag);
        }
        if let Some(callback) = progress {
            config = config.with_progress_callback(callback);
        }

        let outcome = Scanner::new(self.repository.as_ref(), &self.store, config).scan()?;
        Ok(outcome)
    }

    /// Cluster the stored fingerprints and estimate reclaimable storage.
    ///
    /// `require_same_dimensions` overrides the configured rule when given.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::Busy`] while another detection runs and
    /// with [`EngineError::Index`] if the index is missing, outdated or
    /// unreadable.
    pub fn detect(
        &self,
        require_same_dimensions: Option<bool>,
    ) -> Result<DetectionReport, EngineError> {
        let _guard = FlightGuard::acquire(&self.detecting, Operation::Detect)?;

        let index = self.store.load()?;
        let same_dimensions =
            require_same_dimensions.unwrap_or(self.detector.config().require_same_dimensions);
        let groups = self
            .detector
            .group_exact_duplicates(&index.fingerprints, same_dimensions);
        let groups = self
            .estimator
            .estimate_groups(groups, self.repository.as_ref())?;

        let report = DetectionReport {
            index_generated_at: index.generated_at,
            fingerprint_count: index.fingerprints.len(),
            total_estimated_bytes: total_estimated_bytes(&groups),
            groups,
        };
        log::info!(
            "Found {} duplicate groups ({} duplicates) among {} fingerprints",
            report.groups.len(),
            report.duplicate_count(),
            report.fingerprint_count
        );
        Ok(report)
    }

    /// Partition the library into review months in time zone `tz`.
    ///
    /// # Errors
    ///
    /// Fails without library access or if the library cannot be enumerated.
    pub fn months<Tz>(&self, tz: &Tz) -> Result<MonthCatalog, EngineError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.ensure_authorized()?;
        let assets: Vec<SwipeAsset> = self
            .repository
            .all_image_assets()?
            .into_iter()
            .map(SwipeAsset::from)
            .collect();
        Ok(MonthCatalog::from_assets(assets, tz))
    }

    /// Open a started review session for month `key`.
    #[must_use]
    pub fn triage_session(&self, catalog: &MonthCatalog, key: &str) -> Option<TriageSession> {
        let month = catalog.month(key)?.clone();
        let mut session = TriageSession::new(month);
        session.start();
        Some(session)
    }

    /// Commit a session's pending deletions through the engine's deleter.
    pub fn commit(&self, session: &mut TriageSession) -> CommitOutcome {
        session.commit(self.deleter.as_ref())
    }

    /// Render a review thumbnail of one asset.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::AssetNotFound`] (wrapped) for unknown ids.
    /// Rendering failures and cancellation are reported in the outcome.
    pub fn thumbnail(
        &self,
        id: &AssetId,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<ImageOutcome, EngineError> {
        let record = self
            .repository
            .assets_with_ids(std::slice::from_ref(id))?
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::AssetNotFound(id.clone()))?;

        let mut request =
            ImageRequest::new(self.thumbnail_size, self.thumbnail_size).with_network(true);
        if let Some(flag) = cancel {
            request = request.with_cancel(flag);
        }
        let events = self.repository.request_image(&record, &request);
        Ok(ImageOutcome::from_events(id, events))
    }

    /// Delete specific assets, all or nothing.
    ///
    /// Returns the number of distinct assets deleted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Deletion`] with the deleter's error verbatim.
    pub fn delete_assets(&self, ids: &[AssetId]) -> Result<usize, EngineError> {
        self.deleter.delete_assets(ids)?;
        Ok(ids.iter().collect::<HashSet<_>>().len())
    }
}
