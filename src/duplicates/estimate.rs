//! Storage savings estimation.
//!
//! Sizes come from the asset repository when it knows them. Anything the
//! repository cannot answer falls back to a resolution-based guess that
//! assumes a typical JPEG compression ratio.

use thiserror::Error;

use super::groups::DuplicateGroup;
use crate::index::{AssetId, Fingerprint};
use crate::library::{AssetRecord, AssetRepository};

/// Bytes per pixel assumed by the resolution fallback.
pub const DEFAULT_JPEG_FACTOR: f64 = 0.25;

/// Errors from storage estimation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    /// A group violates the representative/duplicates invariants.
    #[error("invalid duplicate group {group}: {reason}")]
    InvalidGroup {
        /// Offending group id
        group: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Estimates reclaimable bytes for duplicate groups.
#[derive(Debug, Clone)]
pub struct StorageEstimator {
    jpeg_factor: f64,
}

impl Default for StorageEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_FACTOR)
    }
}

impl StorageEstimator {
    /// Create an estimator with the given bytes-per-pixel fallback factor.
    #[must_use]
    pub fn new(jpeg_factor: f64) -> Self {
        Self { jpeg_factor }
    }

    /// Fallback factor in bytes per pixel.
    #[must_use]
    pub fn jpeg_factor(&self) -> f64 {
        self.jpeg_factor
    }

    /// Resolution-based size guess; zero dimensions count as one pixel.
    ///
    /// ```
    /// use photoprune::duplicates::StorageEstimator;
    ///
    /// let estimator = StorageEstimator::default();
    /// assert_eq!(estimator.estimate_bytes_from_resolution(1000, 1000), 250_000);
    /// assert_eq!(estimator.estimate_bytes_from_resolution(0, 0), 0);
    /// ```
    #[must_use]
    pub fn estimate_bytes_from_resolution(&self, width: u32, height: u32) -> u64 {
        let pixels = u64::from(width.max(1)) * u64::from(height.max(1));
        (pixels as f64 * self.jpeg_factor) as u64
    }

    /// Attach per-duplicate and total byte estimates to every group.
    ///
    /// Representatives are never counted. Repository failures fall back to
    /// [`estimate_bytes_from_resolution`](Self::estimate_bytes_from_resolution).
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::InvalidGroup`] if a group has no duplicates or
    /// lists its representative among them. No group is returned in that case.
    pub fn estimate_groups(
        &self,
        groups: Vec<DuplicateGroup>,
        repository: &dyn AssetRepository,
    ) -> Result<Vec<DuplicateGroup>, EstimateError> {
        for group in &groups {
            validate(group)?;
        }

        let mut fallbacks = 0usize;
        let estimated: Vec<DuplicateGroup> = groups
            .into_iter()
            .map(|group| self.estimate_group(group, repository, &mut fallbacks))
            .collect();

        if fallbacks > 0 {
            log::debug!("Used resolution fallback for {} asset(s)", fallbacks);
        }
        Ok(estimated)
    }

    fn estimate_group(
        &self,
        mut group: DuplicateGroup,
        repository: &dyn AssetRepository,
        fallbacks: &mut usize,
    ) -> DuplicateGroup {
        let ids = group.duplicate_ids();
        let records = match repository.assets_with_ids(&ids) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Could not fetch assets for group {}: {}", group.id, e);
                Vec::new()
            }
        };

        let mut total = 0u64;
        for duplicate in &group.duplicates {
            let size = records
                .iter()
                .find(|r| r.id == duplicate.id)
                .and_then(|record| repository.resource_size(record));
            let bytes = match size {
                Some(bytes) => bytes,
                None => {
                    *fallbacks += 1;
                    log::debug!("No resource size for {}, estimating", duplicate.id);
                    self.fallback_for(duplicate)
                }
            };
            group.per_asset_estimates.insert(duplicate.id.clone(), bytes);
            total = total.saturating_add(bytes);
        }
        group.estimated_bytes = Some(total);
        group
    }

    fn fallback_for(&self, fingerprint: &Fingerprint) -> u64 {
        self.estimate_bytes_from_resolution(fingerprint.width, fingerprint.height)
    }

    /// Estimate a single asset outside of any group.
    #[must_use]
    pub fn estimate_asset(&self, record: &AssetRecord, repository: &dyn AssetRepository) -> u64 {
        repository
            .resource_size(record)
            .unwrap_or_else(|| self.estimate_bytes_from_resolution(record.width, record.height))
    }
}

fn validate(group: &DuplicateGroup) -> Result<(), EstimateError> {
    if group.duplicates.is_empty() {
        return Err(EstimateError::InvalidGroup {
            group: group.id.to_string(),
            reason: "no duplicates".to_string(),
        });
    }
    let representative: &AssetId = &group.representative.id;
    if group.duplicates.iter().any(|d| &d.id == representative) {
        return Err(EstimateError::InvalidGroup {
            group: group.id.to_string(),
            reason: format!("representative {} listed as duplicate", representative),
        });
    }
    Ok(())
}
