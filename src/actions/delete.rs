//! Asset deletion for the directory-backed library.
//!
//! # Overview
//!
//! [`TrashDeleter`] implements [`AssetDeleter`] for [`FsLibrary`]:
//! - Move to system trash (default, recoverable)
//! - Permanent deletion (with explicit flag)
//! - Whole-batch verification before anything is touched
//!
//! # Safety
//!
//! Every identifier is resolved and checked for existence first. If any
//! asset is missing or escapes the library root the batch is refused and no
//! file is removed. Trash deletion then happens in a single
//! `trash::delete_all` call. Permanent deletion stages every file in a
//! directory under the library root first and only removes them once all of
//! them were moved.
//!
//! # Example
//!
//! ```no_run
//! use photoprune::actions::delete::{DeleteConfig, TrashDeleter};
//! use photoprune::index::AssetId;
//! use photoprune::library::{AssetDeleter, FsLibrary};
//!
//! let deleter = TrashDeleter::new(FsLibrary::new("/photos"), DeleteConfig::trash());
//! deleter.delete_assets(&[AssetId::new("2024/IMG_0002.jpg")]).unwrap();
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::index::AssetId;
use crate::library::{AssetDeleter, FsLibrary};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The asset does not exist (may have been deleted or moved).
    #[error("asset not found: {0}")]
    NotFound(AssetId),

    /// The identifier does not name a file inside the library.
    #[error("invalid asset identifier: {0}")]
    InvalidId(AssetId),

    /// Trash operation failed.
    #[error("trash operation failed: {0}")]
    TrashFailed(String),

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {source}")]
    PermanentDeleteFailed {
        /// File that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The deletion backend refused the request.
    #[error("{0}")]
    Rejected(String),
}

/// Configuration for deletion operations.
#[derive(Debug, Clone, Default)]
pub struct DeleteConfig {
    /// Use permanent deletion instead of trash.
    pub permanent: bool,
}

impl DeleteConfig {
    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self::default()
    }

    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self { permanent: true }
    }
}

/// Deletes assets of an [`FsLibrary`].
#[derive(Debug, Clone)]
pub struct TrashDeleter {
    library: FsLibrary,
    config: DeleteConfig,
}

impl TrashDeleter {
    /// Create a deleter for `library`.
    #[must_use]
    pub fn new(library: FsLibrary, config: DeleteConfig) -> Self {
        Self { library, config }
    }

    /// Whether deletions bypass the trash.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.config.permanent
    }

    fn resolve_all(&self, ids: &[AssetId]) -> Result<Vec<PathBuf>, DeleteError> {
        ids.iter()
            .map(|id| {
                let path = self
                    .library
                    .resolve(id)
                    .ok_or_else(|| DeleteError::InvalidId(id.clone()))?;
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(DeleteError::NotFound(id.clone()))
                }
            })
            .collect()
    }
}

impl AssetDeleter for TrashDeleter {
    fn delete_assets(&self, ids: &[AssetId]) -> Result<(), DeleteError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();
        let paths = self.resolve_all(&unique)?;

        if self.config.permanent {
            remove_permanently(self.library.root(), &paths)?;
            log::info!("Permanently deleted {} asset(s)", paths.len());
        } else {
            trash::delete_all(&paths).map_err(|e| {
                log::error!("Trash operation failed: {}", e);
                DeleteError::TrashFailed(e.to_string())
            })?;
            log::info!("Moved {} asset(s) to trash", paths.len());
        }
        Ok(())
    }
}

/// Remove `paths` as one unit.
///
/// Every file is first renamed into a staging directory under `root`. If any
/// rename fails the staged files are moved back and nothing is deleted. Once
/// all files are staged the directory is removed.
fn remove_permanently(root: &Path, paths: &[PathBuf]) -> Result<(), DeleteError> {
    let staging = tempfile::Builder::new()
        .prefix(".photoprune-delete-")
        .tempdir_in(root)
        .map_err(|source| DeleteError::PermanentDeleteFailed {
            path: root.to_path_buf(),
            source,
        })?;

    let mut staged: Vec<(&Path, PathBuf)> = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        // Numeric names carry no image extension, so a leftover staging
        // directory is never enumerated as part of the library.
        let target = staging.path().join(i.to_string());
        if let Err(source) = fs::rename(path, &target) {
            log::error!("Permanent delete failed for {}: {}", path.display(), source);
            if !restore(&staged) {
                let kept = staging.keep();
                log::error!("Unrestored assets kept in {}", kept.display());
            }
            return Err(DeleteError::PermanentDeleteFailed {
                path: path.clone(),
                source,
            });
        }
        staged.push((path.as_path(), target));
    }

    let staging_path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        log::warn!(
            "Deleted assets left behind in {}: {}",
            staging_path.display(),
            e
        );
    }
    Ok(())
}

/// Move staged files back; false if any stayed in the staging directory.
fn restore(staged: &[(&Path, PathBuf)]) -> bool {
    let mut restored = true;
    for (original, target) in staged.iter().rev() {
        if let Err(e) = fs::rename(target, original) {
            log::error!(
                "Could not restore {} from {}: {}",
                original.display(),
                target.display(),
                e
            );
            restored = false;
        }
    }
    restored
}
