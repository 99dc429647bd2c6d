//! Month partitioning of the library for review.
//!
//! # Overview
//!
//! [`build_months`] turns a flat asset list into [`SwipeMonth`]s keyed by
//! `YYYY-MM` in a chosen time zone. Assets without a date share the
//! `unknown` month, which always sorts after every dated month.
//! [`MonthCatalog`] keeps the months of one run and the summary rows a month
//! list displays.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use photoprune::triage::{build_months, SwipeAsset};
//!
//! let assets = vec![
//!     SwipeAsset::new("a.jpg", Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())),
//!     SwipeAsset::new("b.jpg", Some(Utc.with_ymd_and_hms(2024, 5, 9, 8, 0, 0).unwrap())),
//!     SwipeAsset::new("c.jpg", None),
//! ];
//! let months = build_months(assets, &Utc);
//!
//! let keys: Vec<&str> = months.iter().map(|m| m.key.as_str()).collect();
//! assert_eq!(keys, vec!["2024-05", "2024-03", "unknown"]);
//! assert_eq!(months[1].title, "March 2024");
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::index::AssetId;
use crate::library::AssetRecord;

/// Key of the month holding assets without a creation date.
pub const UNKNOWN_MONTH_KEY: &str = "unknown";

/// Title of the month holding assets without a creation date.
pub const UNKNOWN_MONTH_TITLE: &str = "Unknown";

/// An asset as seen by the review flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeAsset {
    /// Asset identifier
    pub id: AssetId,
    /// Creation date, if known
    pub creation_date: Option<DateTime<Utc>>,
}

impl SwipeAsset {
    /// Create a swipe asset.
    #[must_use]
    pub fn new(id: impl Into<AssetId>, creation_date: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            creation_date,
        }
    }
}

impl From<AssetRecord> for SwipeAsset {
    fn from(record: AssetRecord) -> Self {
        Self {
            id: record.id,
            creation_date: record.creation_time,
        }
    }
}

/// One calendar month of assets, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeMonth {
    /// `YYYY-MM`, or [`UNKNOWN_MONTH_KEY`]
    pub key: String,
    /// Display title such as `March 2024`
    pub title: String,
    /// Assets, newest first
    pub assets: Vec<SwipeAsset>,
}

impl SwipeMonth {
    /// Create a month, sorting its assets newest first.
    #[must_use]
    pub fn new(key: impl Into<String>, title: impl Into<String>, mut assets: Vec<SwipeAsset>) -> Self {
        sort_newest_first(&mut assets);
        Self {
            key: key.into(),
            title: title.into(),
            assets,
        }
    }

    /// Number of assets in the month.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if the month has no assets left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Check if `id` belongs to this month.
    #[must_use]
    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.iter().any(|a| &a.id == id)
    }

    /// Position of `id` in the month.
    #[must_use]
    pub fn position(&self, id: &AssetId) -> Option<usize> {
        self.assets.iter().position(|a| &a.id == id)
    }

    /// Drop the given assets, keeping the order of the rest.
    pub fn remove_assets(&mut self, ids: &[AssetId]) {
        self.assets.retain(|a| !ids.contains(&a.id));
    }
}

/// One row of the month list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    /// Month key
    pub key: String,
    /// Display title
    pub title: String,
    /// Assets in the month
    pub total_count: usize,
    /// Assets currently marked for deletion
    pub pending_deletion_count: usize,
}

/// Partition assets into months in the given time zone.
///
/// Month keys come out newest first with [`UNKNOWN_MONTH_KEY`] last. Each
/// month's assets are newest first, undated last, ties by id.
pub fn build_months<Tz>(assets: Vec<SwipeAsset>, tz: &Tz) -> Vec<SwipeMonth>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut buckets: BTreeMap<String, (String, Vec<SwipeAsset>)> = BTreeMap::new();
    for asset in assets {
        let (key, title) = match asset.creation_date {
            Some(date) => {
                let local = date.with_timezone(tz);
                (
                    local.format("%Y-%m").to_string(),
                    local.format("%B %Y").to_string(),
                )
            }
            None => (
                UNKNOWN_MONTH_KEY.to_string(),
                UNKNOWN_MONTH_TITLE.to_string(),
            ),
        };
        buckets
            .entry(key)
            .or_insert_with(|| (title, Vec::new()))
            .1
            .push(asset);
    }

    let unknown = buckets.remove(UNKNOWN_MONTH_KEY);
    let mut months: Vec<SwipeMonth> = buckets
        .into_iter()
        .rev()
        .map(|(key, (title, assets))| SwipeMonth::new(key, title, assets))
        .collect();
    if let Some((title, assets)) = unknown {
        months.push(SwipeMonth::new(UNKNOWN_MONTH_KEY, title, assets));
    }

    log::debug!("Partitioned library into {} months", months.len());
    months
}

fn sort_newest_first(assets: &mut [SwipeAsset]) {
    assets.sort_by(|a, b| {
        let by_date = match (a.creation_date, b.creation_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then_with(|| a.id.cmp(&b.id))
    });
}

/// The months of one run, with pending-deletion counts per month.
#[derive(Debug, Clone, Default)]
pub struct MonthCatalog {
    months: Vec<SwipeMonth>,
    pending: BTreeMap<String, usize>,
}

impl MonthCatalog {
    /// Create a catalog from months in display order.
    #[must_use]
    pub fn new(months: Vec<SwipeMonth>) -> Self {
        Self {
            months,
            pending: BTreeMap::new(),
        }
    }

    /// Build a catalog from raw assets.
    #[must_use]
    pub fn from_assets<Tz>(assets: Vec<SwipeAsset>, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self::new(build_months(assets, tz))
    }

    /// Months in display order.
    #[must_use]
    pub fn months(&self) -> &[SwipeMonth] {
        &self.months
    }

    /// Look up a month by key.
    #[must_use]
    pub fn month(&self, key: &str) -> Option<&SwipeMonth> {
        self.months.iter().find(|m| m.key == key)
    }

    /// Replace a month after its assets changed, e.g. following a commit.
    ///
    /// Unknown keys are ignored; the catalog never gains months mid-run.
    pub fn store_month(&mut self, month: SwipeMonth) {
        if let Some(slot) = self.months.iter_mut().find(|m| m.key == month.key) {
            *slot = month;
        } else {
            log::warn!("Ignoring update for unknown month {}", month.key);
        }
    }

    /// Record how many assets of a month are marked for deletion.
    pub fn update_pending(&mut self, key: &str, count: usize) {
        self.pending.insert(key.to_string(), count);
    }

    /// Summary rows in display order.
    #[must_use]
    pub fn summaries(&self) -> Vec<MonthSummary> {
        self.months
            .iter()
            .map(|m| MonthSummary {
                key: m.key.clone(),
                title: m.title.clone(),
                total_count: m.len(),
                pending_deletion_count: self.pending.get(&m.key).copied().unwrap_or(0),
            })
            .collect()
    }
}
