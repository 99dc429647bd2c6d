//! Exact-duplicate clustering.
//!
//! # Overview
//!
//! Groups fingerprints that are the same picture stored more than once:
//! 1. **Hash buckets**: equal 64-bit hashes only
//! 2. **Dimension buckets**: equal `(width, height)` when required
//! 3. **Time clusters**: capture times chained within a window (default five minutes)
//! 4. **Representative**: the largest, then earliest, then lowest-id member is kept
//!
//! A cluster never spans two hash buckets or, when dimensions are required,
//! two dimension buckets. Clusters of one are dropped.
//!
//! # Example
//!
//! ```
//! use photoprune::duplicates::{DetectorConfig, DuplicateDetector};
//! use photoprune::index::Fingerprint;
//! use std::time::Duration;
//!
//! let detector = DuplicateDetector::new(
//!     DetectorConfig::default().with_creation_window(Duration::from_secs(120)),
//! );
//! let groups = detector.group_exact_duplicates(
//!     &[
//!         Fingerprint::new("0", Some(1_000.0), 100, 100, 1),
//!         Fingerprint::new("1", Some(1_060.0), 100, 100, 1),
//!     ],
//!     true,
//! );
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].representative.id.as_str(), "0");
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use super::groups::DuplicateGroup;
use crate::index::{cmp_creation_time, Fingerprint};

/// Default window within which same-hash captures are treated as copies.
pub const DEFAULT_CREATION_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Configuration for duplicate clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Largest gap between consecutive captures in one cluster.
    pub creation_window: Duration,
    /// Default for the dimension requirement used by [`DuplicateDetector::detect`].
    pub require_same_dimensions: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            creation_window: DEFAULT_CREATION_WINDOW,
            require_same_dimensions: true,
        }
    }
}

impl DetectorConfig {
    /// Set the clustering window.
    #[must_use]
    pub fn with_creation_window(mut self, window: Duration) -> Self {
        self.creation_window = window;
        self
    }

    /// Set the default dimension requirement.
    #[must_use]
    pub fn with_require_same_dimensions(mut self, required: bool) -> Self {
        self.require_same_dimensions = required;
        self
    }
}

/// Groups fingerprints into exact-duplicate sets.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    config: DetectorConfig,
}

impl DuplicateDetector {
    /// Create a detector with the given configuration.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Group using the configured dimension requirement.
    #[must_use]
    pub fn detect(&self, items: &[Fingerprint]) -> Vec<DuplicateGroup> {
        self.group_exact_duplicates(items, self.config.require_same_dimensions)
    }

    /// Group fingerprints that share a hash, optionally dimensions, and a
    /// capture-time neighbourhood.
    ///
    /// Input order does not affect the result: groups come out ordered by
    /// hash, then dimensions, then earliest capture.
    #[must_use]
    pub fn group_exact_duplicates(
        &self,
        items: &[Fingerprint],
        require_same_dimensions: bool,
    ) -> Vec<DuplicateGroup> {
        if items.is_empty() {
            return Vec::new();
        }

        let mut buckets: BTreeMap<u64, Vec<&Fingerprint>> = BTreeMap::new();
        for item in items {
            buckets.entry(item.hash).or_default().push(item);
        }

        let mut groups = Vec::new();
        for candidates in buckets.into_values() {
            if candidates.len() < 2 {
                continue;
            }

            let subsets: Vec<Vec<&Fingerprint>> = if require_same_dimensions {
                let mut by_dimension: BTreeMap<(u32, u32), Vec<&Fingerprint>> = BTreeMap::new();
                for candidate in candidates {
                    by_dimension
                        .entry(candidate.dimensions())
                        .or_default()
                        .push(candidate);
                }
                by_dimension.into_values().collect()
            } else {
                vec![candidates]
            };

            for subset in subsets {
                for mut cluster in self.cluster_by_creation_time(subset) {
                    cluster.sort_by(|a, b| keep_order(a, b));
                    let mut members = cluster.into_iter().cloned();
                    let Some(representative) = members.next() else {
                        continue;
                    };
                    groups.push(DuplicateGroup::new(representative, members.collect()));
                }
            }
        }

        log::debug!(
            "Grouped {} fingerprints into {} duplicate groups",
            items.len(),
            groups.len()
        );
        groups
    }

    /// Split one candidate set into clusters of two or more.
    fn cluster_by_creation_time<'a>(
        &self,
        mut items: Vec<&'a Fingerprint>,
    ) -> Vec<Vec<&'a Fingerprint>> {
        if items.len() < 2 {
            return Vec::new();
        }

        items.sort_by(|a, b| {
            cmp_creation_time(a.creation_time, b.creation_time).then_with(|| a.id.cmp(&b.id))
        });

        let mut clusters = Vec::new();
        let mut current: Vec<&Fingerprint> = Vec::new();
        for candidate in items {
            let close = current
                .last()
                .is_some_and(|last| self.creation_times_close(last, candidate));
            if !close && !current.is_empty() {
                let finished = std::mem::take(&mut current);
                if finished.len() >= 2 {
                    clusters.push(finished);
                }
            }
            current.push(candidate);
        }
        if current.len() >= 2 {
            clusters.push(current);
        }
        clusters
    }

    fn creation_times_close(&self, last: &Fingerprint, next: &Fingerprint) -> bool {
        match (last.creation_time, next.creation_time) {
            (Some(l), Some(r)) => (r - l).abs() <= self.config.creation_window.as_secs_f64(),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Order members best-to-keep first: larger area, then earlier capture
/// (missing last), then lower identifier.
fn keep_order(a: &Fingerprint, b: &Fingerprint) -> Ordering {
    b.area()
        .cmp(&a.area())
        .then_with(|| cmp_creation_time(a.creation_time, b.creation_time))
        .then_with(|| a.id.cmp(&b.id))
}
