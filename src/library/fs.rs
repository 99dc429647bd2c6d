//! Directory-backed photo library.
//!
//! Every image file under the root is an asset. Its identifier is the path
//! relative to the root with `/` separators, so identifiers stay stable across
//! platforms and across runs.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{
    AssetRecord, AssetRepository, AuthorizationState, Authorizer, ImageEvent, ImageRequest,
    LibraryError,
};
use crate::index::{cmp_creation_time, AssetId};

/// File extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// A photo library rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsLibrary {
    root: PathBuf,
}

impl FsLibrary {
    /// Create a library over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Library root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an identifier back to a path under the root.
    ///
    /// Returns `None` for identifiers that are empty or would leave the root.
    #[must_use]
    pub fn resolve(&self, id: &AssetId) -> Option<PathBuf> {
        let relative = Path::new(id.as_str());
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }

    fn id_for(&self, path: &Path) -> Option<AssetId> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(AssetId::new(parts.join("/")))
        }
    }

    fn record_for(&self, id: AssetId, path: &Path) -> Result<AssetRecord, LibraryError> {
        let metadata = fs::metadata(path)
            .map_err(|e| LibraryError::AssetFetchFailed(format!("{}: {}", path.display(), e)))?;
        let creation_time = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(system_time_to_utc);

        let (width, height) = match image::image_dimensions(path) {
            Ok(dims) => dims,
            Err(e) => {
                log::debug!("Could not read dimensions of {}: {}", path.display(), e);
                (0, 0)
            }
        };

        let mut record = AssetRecord::new(id, creation_time, width, height);
        if let Some(revision) = revision_of(&metadata) {
            record = record.with_revision(revision);
        }
        Ok(record)
    }

    fn sort_records(records: &mut [AssetRecord]) {
        records.sort_by(|a, b| {
            cmp_creation_time(a.creation_seconds(), b.creation_seconds())
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Check whether `path` has one of the [`IMAGE_EXTENSIONS`].
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Change marker of a file: modification time in nanoseconds and byte size.
///
/// Birth time survives in-place edits, so it cannot tell a rewritten photo
/// from the original.
fn revision_of(metadata: &fs::Metadata) -> Option<String> {
    let modified = metadata.modified().ok()?;
    let nanos = DateTime::<Utc>::from(modified).timestamp_nanos_opt()?;
    Some(format!("{}:{}", nanos, metadata.len()))
}

impl AssetRepository for FsLibrary {
    fn all_image_assets(&self) -> Result<Vec<AssetRecord>, LibraryError> {
        if !self.root.is_dir() {
            return Err(LibraryError::AssetFetchFailed(format!(
                "library root is not a directory: {}",
                self.root.display()
            )));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable library entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_image_path(entry.path()) {
                continue;
            }
            let Some(id) = self.id_for(entry.path()) else {
                continue;
            };
            match self.record_for(id, entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping asset: {}", e),
            }
        }

        Self::sort_records(&mut records);
        log::debug!(
            "Enumerated {} image assets under {}",
            records.len(),
            self.root.display()
        );
        Ok(records)
    }

    fn assets_with_ids(&self, ids: &[AssetId]) -> Result<Vec<AssetRecord>, LibraryError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(path) = self.resolve(id) else {
                continue;
            };
            if path.is_file() {
                records.push(self.record_for(id.clone(), &path)?);
            }
        }
        Self::sort_records(&mut records);
        Ok(records)
    }

    fn request_image(&self, asset: &AssetRecord, request: &ImageRequest) -> Vec<ImageEvent> {
        if request.is_cancelled() {
            return vec![ImageEvent::Cancelled];
        }
        let Some(path) = self.resolve(&asset.id) else {
            return vec![ImageEvent::Failed(LibraryError::AssetNotFound(
                asset.id.clone(),
            ))];
        };

        let decoded = match image::open(&path) {
            Ok(img) => img,
            Err(e) => {
                return vec![ImageEvent::Failed(LibraryError::ImageRequestFailed {
                    id: asset.id.clone(),
                    reason: e.to_string(),
                })]
            }
        };

        // Decoding is the slow part; a request dismissed meanwhile is dropped.
        if request.is_cancelled() {
            return vec![ImageEvent::Cancelled];
        }

        let width = request.target_width.max(1);
        let height = request.target_height.max(1);
        vec![ImageEvent::Final(decoded.thumbnail(width, height))]
    }

    fn resource_size(&self, asset: &AssetRecord) -> Option<u64> {
        let path = self.resolve(&asset.id)?;
        fs::metadata(path).ok().map(|m| m.len())
    }
}

impl Authorizer for FsLibrary {
    fn authorization_state(&self) -> AuthorizationState {
        let metadata = match fs::metadata(&self.root) {
            Ok(m) => m,
            Err(_) => return AuthorizationState::Denied,
        };
        if !metadata.is_dir() {
            return AuthorizationState::Restricted;
        }
        if fs::read_dir(&self.root).is_err() {
            return AuthorizationState::Denied;
        }
        if metadata.permissions().readonly() {
            AuthorizationState::Limited
        } else {
            AuthorizationState::Authorized
        }
    }

    fn request_authorization(&self) -> AuthorizationState {
        // A directory has no consent prompt; access is whatever the filesystem grants.
        self.authorization_state()
    }
}
