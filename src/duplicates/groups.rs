//! Duplicate group definitions.
//!
//! # Overview
//!
//! A [`DuplicateGroup`] is one kept representative plus the assets judged
//! identical to it. Groups are produced by
//! [`DuplicateDetector`](super::DuplicateDetector) and enriched with byte
//! estimates by [`StorageEstimator`](super::StorageEstimator). Each stage
//! takes the groups by value and returns new ones.
//!
//! # Example
//!
//! ```
//! use photoprune::duplicates::DuplicateGroup;
//! use photoprune::index::Fingerprint;
//!
//! let keep = Fingerprint::new("a.jpg", Some(0.0), 100, 100, 1);
//! let copy = Fingerprint::new("b.jpg", Some(5.0), 100, 100, 1);
//! let group = DuplicateGroup::new(keep, vec![copy]);
//!
//! assert_eq!(group.len(), 2);
//! assert_eq!(group.duplicate_count(), 1);
//! assert!(group.estimated_bytes.is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::index::{AssetId, Fingerprint};

/// Identifier of a duplicate group.
///
/// Derived from the group's hash and member identifiers, so the same members
/// always produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Derive the id for a group from its members.
    #[must_use]
    pub fn derive(representative: &Fingerprint, duplicates: &[Fingerprint]) -> Self {
        let mut ids: Vec<&str> = std::iter::once(representative)
            .chain(duplicates)
            .map(|f| f.id.as_str())
            .collect();
        ids.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&representative.hash.to_le_bytes());
        for id in ids {
            hasher.update(&(id.len() as u64).to_le_bytes());
            hasher.update(id.as_bytes());
        }
        let hex = hasher.finalize().to_hex();
        Self(hex.as_str()[..16].to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confirmed duplicate group of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Group identifier
    pub id: GroupId,
    /// The asset to keep
    pub representative: Fingerprint,
    /// Candidates for deletion, best-to-keep first
    pub duplicates: Vec<Fingerprint>,
    /// Bytes reclaimable by deleting every duplicate
    pub estimated_bytes: Option<u64>,
    /// Reclaimable bytes per duplicate
    pub per_asset_estimates: BTreeMap<AssetId, u64>,
}

impl DuplicateGroup {
    /// Create a group without estimates.
    ///
    /// # Arguments
    ///
    /// * `representative` - The asset to keep
    /// * `duplicates` - The remaining members
    #[must_use]
    pub fn new(representative: Fingerprint, duplicates: Vec<Fingerprint>) -> Self {
        Self {
            id: GroupId::derive(&representative, &duplicates),
            representative,
            duplicates,
            estimated_bytes: None,
            per_asset_estimates: BTreeMap::new(),
        }
    }

    /// Number of assets in the group, representative included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.duplicates.len() + 1
    }

    /// A group always contains its representative.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of deletion candidates.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    /// Identifiers of every member, representative first.
    #[must_use]
    pub fn member_ids(&self) -> Vec<&AssetId> {
        std::iter::once(&self.representative)
            .chain(&self.duplicates)
            .map(|f| &f.id)
            .collect()
    }

    /// Identifiers of the deletion candidates.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<AssetId> {
        self.duplicates.iter().map(|f| f.id.clone()).collect()
    }

    /// Estimated reclaimable bytes for one duplicate.
    #[must_use]
    pub fn estimated_bytes_for(&self, id: &AssetId) -> Option<u64> {
        self.per_asset_estimates.get(id).copied()
    }

    /// Check the structural invariants: at least one duplicate and the
    /// representative not repeated among them.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.duplicates.is_empty()
            && self
                .duplicates
                .iter()
                .all(|d| d.id != self.representative.id)
    }
}

/// Sum of the estimates of every group that has one.
#[must_use]
pub fn total_estimated_bytes(groups: &[DuplicateGroup]) -> u64 {
    groups.iter().filter_map(|g| g.estimated_bytes).sum()
}

/// Look up a per-asset estimate across groups.
#[must_use]
pub fn estimated_bytes_for(groups: &[DuplicateGroup], id: &AssetId) -> Option<u64> {
    groups.iter().find_map(|g| g.estimated_bytes_for(id))
}
