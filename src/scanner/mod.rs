//! Scanner module for fingerprinting a photo library.
//!
//! This module provides functionality for:
//! - Enumerating library assets through an [`AssetRepository`]
//! - Perceptual hashing of small renditions ([`perceptual`])
//! - Reusing fingerprints of a previous index for unchanged assets
//! - Cooperative cancellation with a resumable partial index
//!
//! # Architecture
//!
//! [`Scanner::scan`] runs in three steps:
//! 1. Load the previous index, if any, and enumerate assets
//! 2. Hash every asset on a bounded rayon pool, keeping enumeration order
//! 3. Write the merged index atomically through [`IndexStore`]
//!
//! When the cancel flag is raised, assets not yet visited keep their previous
//! fingerprint (if it still matches) so a later scan resumes where this one
//! stopped. A scan only counts as cancelled when the flag actually left some
//! asset unvisited.
//!
//! # Example
//!
//! ```no_run
//! use photoprune::index::IndexStore;
//! use photoprune::library::FsLibrary;
//! use photoprune::scanner::{ScanConfig, Scanner};
//!
//! let library = FsLibrary::new("/photos");
//! let store = IndexStore::new("/tmp/photo_fingerprints.json");
//! let outcome = Scanner::new(&library, &store, ScanConfig::default()).scan().unwrap();
//! println!("Indexed {} / {} assets", outcome.indexed_total(), outcome.total);
//! ```

pub mod perceptual;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::index::{AssetId, Fingerprint, FingerprintIndex, IndexError, IndexStore};
use crate::library::{AssetRecord, AssetRepository, ImageOutcome, ImageRequest, LibraryError};
use crate::progress::ProgressCallback;

pub use perceptual::{dhash64, hamming_distance};

/// Progress phase name used while hashing.
pub const PHASE_HASHING: &str = "hashing";

/// Configuration for a scan.
#[derive(Clone)]
pub struct ScanConfig {
    /// Edge length of the square rendition requested for hashing.
    pub hash_target_size: u32,
    /// Allow the repository to download remote originals.
    pub allow_network: bool,
    /// Number of hashing threads.
    /// Default is 4 to keep decoding from starving the rest of the system.
    pub threads: usize,
    /// Reuse fingerprints of unchanged assets from the previous index.
    ///
    /// Only affects assets the scan visits. When a scan is cancelled, assets
    /// it never reached keep their previous fingerprint if it still matches,
    /// even with reuse disabled, so a cancelled full rescan loses nothing.
    pub reuse_existing: bool,
    /// Optional cancel flag.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
            .field("hash_target_size", &self.hash_target_size)
            .field("allow_network", &self.allow_network)
            .field("threads", &self.threads)
            .field("reuse_existing", &self.reuse_existing)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            hash_target_size: 18,
            allow_network: false,
            threads: 4,
            reuse_existing: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ScanConfig {
    /// Set the rendition size used for hashing.
    #[must_use]
    pub fn with_hash_target_size(mut self, size: u32) -> Self {
        self.hash_target_size = size.max(1);
        self
    }

    /// Allow or forbid network downloads.
    #[must_use]
    pub fn with_network(mut self, allow: bool) -> Self {
        self.allow_network = allow;
        self
    }

    /// Set the hashing thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Enable or disable reuse of the previous index.
    #[must_use]
    pub fn with_reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    /// Set the cancel flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that abort a scan.
///
/// Per-asset failures never abort; they are counted in
/// [`ScanOutcome::skipped`].
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The library could not be enumerated.
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The index could not be written.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Result of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Assets enumerated
    pub total: usize,
    /// Assets hashed during this scan
    pub indexed: usize,
    /// Assets whose previous fingerprint was kept
    pub reused: usize,
    /// Assets whose image could not be loaded
    pub skipped: usize,
    /// Whether the scan stopped early
    pub cancelled: bool,
    /// Where the index was written
    pub index_path: PathBuf,
}

impl ScanOutcome {
    /// Number of fingerprints in the written index.
    #[must_use]
    pub fn indexed_total(&self) -> usize {
        self.indexed + self.reused
    }

    /// Check if some assets are missing from the index.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.cancelled || self.skipped > 0
    }
}

/// What happened to one asset.
enum Slot {
    Hashed(Fingerprint),
    Reused(Fingerprint),
    Skipped,
    Unvisited,
}

/// Builds and persists the fingerprint index of a library.
pub struct Scanner<'a> {
    repository: &'a dyn AssetRepository,
    store: &'a IndexStore,
    config: ScanConfig,
}

impl<'a> Scanner<'a> {
    /// Create a scanner writing to `store`.
    #[must_use]
    pub fn new(repository: &'a dyn AssetRepository, store: &'a IndexStore, config: ScanConfig) -> Self {
        Self {
            repository,
            store,
            config,
        }
    }

    /// Fingerprint every asset and write the index.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Library`] if the library cannot be enumerated and
    /// [`ScanError::Index`] if the index cannot be written. A cancelled scan
    /// is not an error; see [`ScanOutcome::cancelled`].
    pub fn scan(&self) -> Result<ScanOutcome, ScanError> {
        let previous = self.load_previous();
        let assets = self.repository.all_image_assets()?;
        let total = assets.len();
        log::info!(
            "Scanning {} assets ({} previous fingerprints)",
            total,
            previous.len()
        );

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_HASHING, total);
        }

        let reusable = if self.config.reuse_existing {
            Some(&previous)
        } else {
            None
        };
        let slots = self.hash_all(&assets, reusable);

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }

        let interrupted = self.config.is_shutdown_requested();
        let mut outcome = ScanOutcome {
            total,
            indexed: 0,
            reused: 0,
            skipped: 0,
            cancelled: false,
            index_path: self.store.path().to_path_buf(),
        };
        let mut fingerprints = Vec::with_capacity(total);
        for (asset, slot) in assets.iter().zip(slots) {
            match slot {
                Slot::Hashed(fp) => {
                    outcome.indexed += 1;
                    fingerprints.push(fp);
                }
                Slot::Reused(fp) => {
                    outcome.reused += 1;
                    fingerprints.push(fp);
                }
                Slot::Skipped => outcome.skipped += 1,
                Slot::Unvisited => {
                    outcome.cancelled |= interrupted;
                    if let Some(fp) = matching_fingerprint(&previous, asset) {
                        outcome.reused += 1;
                        fingerprints.push(fp.clone());
                    } else if !interrupted {
                        // Dismissed by the repository alone; the scan went on.
                        outcome.skipped += 1;
                    }
                }
            }
        }

        self.store.save(&FingerprintIndex::new(fingerprints))?;

        if outcome.cancelled {
            log::info!(
                "Scan cancelled: {} of {} assets indexed",
                outcome.indexed_total(),
                total
            );
        } else {
            log::info!(
                "Scan complete: {} hashed, {} reused, {} skipped",
                outcome.indexed,
                outcome.reused,
                outcome.skipped
            );
        }
        Ok(outcome)
    }

    /// Previous fingerprints by id; an unusable index counts as empty.
    fn load_previous(&self) -> HashMap<AssetId, Fingerprint> {
        match self.store.load() {
            Ok(index) => index
                .fingerprints
                .into_iter()
                .map(|fp| (fp.id.clone(), fp))
                .collect(),
            Err(IndexError::NotFound(_)) => HashMap::new(),
            Err(e) => {
                log::warn!("Ignoring previous index: {}", e);
                HashMap::new()
            }
        }
    }

    fn hash_all(
        &self,
        assets: &[AssetRecord],
        reusable: Option<&HashMap<AssetId, Fingerprint>>,
    ) -> Vec<Slot> {
        let done = AtomicUsize::new(0);
        let work = |asset: &AssetRecord| {
            let slot = self.hash_one(asset, reusable);
            if !matches!(slot, Slot::Unvisited) {
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref callback) = self.config.progress_callback {
                    callback.on_progress(n, asset.id.as_str());
                }
            }
            slot
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
        {
            Ok(pool) => pool.install(|| assets.par_iter().map(work).collect()),
            Err(e) => {
                log::warn!("Failed to create hashing thread pool, hashing serially: {}", e);
                assets.iter().map(work).collect()
            }
        }
    }

    fn hash_one(
        &self,
        asset: &AssetRecord,
        reusable: Option<&HashMap<AssetId, Fingerprint>>,
    ) -> Slot {
        if self.config.is_shutdown_requested() {
            return Slot::Unvisited;
        }
        if let Some(fp) = reusable.and_then(|prev| matching_fingerprint(prev, asset)) {
            log::trace!("Reusing fingerprint: {}", asset.id);
            return Slot::Reused(fp.clone());
        }

        let size = self.config.hash_target_size;
        let mut request = ImageRequest::new(size, size).with_network(self.config.allow_network);
        if let Some(ref flag) = self.config.shutdown_flag {
            request = request.with_cancel(flag.clone());
        }

        let events = self.repository.request_image(asset, &request);
        match ImageOutcome::from_events(&asset.id, events) {
            ImageOutcome::Delivered(image) => {
                let hash = dhash64(&image);
                log::trace!("Hashed {}: {:016x}", asset.id, hash);
                Slot::Hashed(
                    Fingerprint::new(
                        asset.id.clone(),
                        asset.creation_seconds(),
                        asset.width,
                        asset.height,
                        hash,
                    )
                    .with_revision(asset.revision.clone()),
                )
            }
            ImageOutcome::Cancelled => Slot::Unvisited,
            ImageOutcome::Failed(e) => {
                log::warn!("Skipping {}: {}", asset.id, e);
                Slot::Skipped
            }
        }
    }
}

/// A previous fingerprint still describes `asset` when its dimensions,
/// creation time and change marker are unchanged.
///
/// A fingerprint written without a marker never matches an asset that has one.
fn matching_fingerprint<'p>(
    previous: &'p HashMap<AssetId, Fingerprint>,
    asset: &AssetRecord,
) -> Option<&'p Fingerprint> {
    previous.get(&asset.id).filter(|fp| {
        fp.width == asset.width
            && fp.height == asset.height
            && fp.creation_time == asset.creation_seconds()
            && fp.revision == asset.revision
    })
}
