//! Photo library collaborators.
//!
//! The engine never talks to a concrete photo store. It goes through three
//! capabilities defined here:
//!
//! * [`AssetRepository`]: enumerate assets, fetch them by id, render small
//!   images and resolve on-disk sizes.
//! * [`AssetDeleter`]: delete a set of assets, all or nothing.
//! * [`Authorizer`]: report and request access to the library.
//!
//! [`fs::FsLibrary`] implements the repository and authorization over a
//! directory of image files; [`crate::actions::delete::TrashDeleter`] is the
//! matching deleter.
//!
//! # Image requests
//!
//! A request may deliver low-quality previews before the final image, may be
//! cancelled, or may fail. The raw deliveries are [`ImageEvent`]s;
//! [`ImageOutcome::from_events`] collapses them into a single three-way result
//! and ignores degraded previews.

pub mod fs;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use thiserror::Error;

use crate::actions::delete::DeleteError;
use crate::index::AssetId;

pub use fs::FsLibrary;

/// Errors raised by an asset repository.
///
/// During scans and estimation these are per-asset failures: they are logged
/// and the asset is skipped.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The repository could not enumerate or fetch assets.
    #[error("failed to fetch assets: {0}")]
    AssetFetchFailed(String),

    /// No asset with this identifier exists.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// Rendering an image for the asset failed.
    #[error("image request failed for {id}: {reason}")]
    ImageRequestFailed {
        /// Asset that was requested
        id: AssetId,
        /// Reason reported by the backend
        reason: String,
    },
}

/// Library access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationState {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access was refused.
    Denied,
    /// Access is blocked by policy.
    Restricted,
    /// Access to a subset of the library.
    Limited,
    /// Full access.
    Authorized,
}

impl AuthorizationState {
    /// Whether this state is sufficient to start a scan.
    #[must_use]
    pub fn allows_scan(self) -> bool {
        matches!(self, Self::Authorized | Self::Limited)
    }
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDetermined => write!(f, "not determined"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
            Self::Limited => write!(f, "limited"),
            Self::Authorized => write!(f, "authorized"),
        }
    }
}

/// Metadata of one library asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    /// Stable identifier
    pub id: AssetId,
    /// Capture or creation time, if known
    pub creation_time: Option<DateTime<Utc>>,
    /// Pixel width (0 when unknown)
    pub width: u32,
    /// Pixel height (0 when unknown)
    pub height: u32,
    /// Opaque marker that changes whenever the asset content may have changed
    pub revision: Option<String>,
}

impl AssetRecord {
    /// Create a new asset record.
    #[must_use]
    pub fn new(
        id: impl Into<AssetId>,
        creation_time: Option<DateTime<Utc>>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            creation_time,
            width,
            height,
            revision: None,
        }
    }

    /// Attach a change marker.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Creation time as fractional seconds since the Unix epoch.
    #[must_use]
    pub fn creation_seconds(&self) -> Option<f64> {
        self.creation_time
            .map(|t| t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9)
    }
}

/// Parameters of a small-image request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Target width in pixels (aspect-fit)
    pub target_width: u32,
    /// Target height in pixels (aspect-fit)
    pub target_height: u32,
    /// Whether assets stored remotely may be downloaded
    pub allow_network: bool,
    /// Cancellation flag checked by the repository
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ImageRequest {
    /// Request an image fitting in `width` x `height`, local only.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target_width: width,
            target_height: height,
            allow_network: false,
            cancel: None,
        }
    }

    /// Allow or forbid network fetches.
    #[must_use]
    pub fn with_network(mut self, allow: bool) -> Self {
        self.allow_network = allow;
        self
    }

    /// Attach a cancellation flag.
    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Check if the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// A single delivery from an image request.
#[derive(Debug)]
pub enum ImageEvent {
    /// Low-quality intermediate image; callers wait for the final one.
    Degraded(DynamicImage),
    /// Final image.
    Final(DynamicImage),
    /// The request was cancelled.
    Cancelled,
    /// The request failed.
    Failed(LibraryError),
}

/// Result of an image request.
#[derive(Debug)]
pub enum ImageOutcome {
    /// The final image.
    Delivered(DynamicImage),
    /// The request was cancelled; nothing should be recorded.
    Cancelled,
    /// The request failed.
    Failed(LibraryError),
}

impl ImageOutcome {
    /// Collapse a request's deliveries into one outcome.
    ///
    /// The first terminal event wins. Degraded previews are skipped. A stream
    /// that ends without a terminal event is a failure for `id`.
    pub fn from_events(id: &AssetId, events: impl IntoIterator<Item = ImageEvent>) -> Self {
        for event in events {
            match event {
                ImageEvent::Degraded(_) => continue,
                ImageEvent::Final(img) => return Self::Delivered(img),
                ImageEvent::Cancelled => return Self::Cancelled,
                ImageEvent::Failed(err) => return Self::Failed(err),
            }
        }
        Self::Failed(LibraryError::ImageRequestFailed {
            id: id.clone(),
            reason: "no final image delivered".to_string(),
        })
    }
}

/// Source of assets, images and sizes.
pub trait AssetRepository: Send + Sync {
    /// Every image asset, ordered by creation time ascending.
    fn all_image_assets(&self) -> Result<Vec<AssetRecord>, LibraryError>;

    /// The assets among `ids` that still exist, ordered by creation time.
    fn assets_with_ids(&self, ids: &[AssetId]) -> Result<Vec<AssetRecord>, LibraryError>;

    /// Render a small image of `asset`.
    fn request_image(&self, asset: &AssetRecord, request: &ImageRequest) -> Vec<ImageEvent>;

    /// Total on-disk size of the asset's resources, if known.
    fn resource_size(&self, asset: &AssetRecord) -> Option<u64>;
}

/// Deletes assets from the library.
pub trait AssetDeleter: Send + Sync {
    /// Delete every asset in `ids` or none of them. Empty input succeeds.
    fn delete_assets(&self, ids: &[AssetId]) -> Result<(), DeleteError>;
}

/// Reports and requests library access.
pub trait Authorizer: Send + Sync {
    /// Current access level.
    fn authorization_state(&self) -> AuthorizationState;

    /// Ask for access and return the resulting level.
    fn request_authorization(&self) -> AuthorizationState;
}
