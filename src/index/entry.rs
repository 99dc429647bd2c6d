//! Fingerprint definitions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Stable identifier of an asset in the photo library.
///
/// Kept as a newtype so decision ledgers and per-asset estimate maps can only
/// be keyed by asset identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create an identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Content fingerprint of one asset.
///
/// Field names on disk follow the index file format; keys are emitted in
/// sorted order by [`crate::index::IndexStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Asset identifier
    #[serde(rename = "localIdentifier")]
    pub id: AssetId,
    /// Creation time in seconds since the Unix epoch
    #[serde(rename = "creationTime")]
    pub creation_time: Option<f64>,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// 64-bit difference hash
    #[serde(rename = "dHash64")]
    pub hash: u64,
    /// Change marker of the asset when it was hashed, if the library has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl Fingerprint {
    /// Create a new fingerprint.
    #[must_use]
    pub fn new(
        id: impl Into<AssetId>,
        creation_time: Option<f64>,
        width: u32,
        height: u32,
        hash: u64,
    ) -> Self {
        Self {
            id: id.into(),
            creation_time,
            width,
            height,
            hash,
            revision: None,
        }
    }

    /// Record the change marker the asset had when it was hashed.
    #[must_use]
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Pixel area, widened so large panoramas cannot overflow.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Dimensions as a `(width, height)` pair.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Order two optional creation times ascending, with missing times last.
#[must_use]
pub fn cmp_creation_time(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(l), Some(r)) => l.total_cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_does_not_overflow() {
        let fp = Fingerprint::new("a", None, u32::MAX, 2, 0);
        assert_eq!(fp.area(), u64::from(u32::MAX) * 2);
    }

    #[test]
    fn test_missing_creation_time_sorts_last() {
        assert_eq!(cmp_creation_time(Some(5.0), None), Ordering::Less);
        assert_eq!(cmp_creation_time(None, Some(5.0)), Ordering::Greater);
        assert_eq!(cmp_creation_time(None, None), Ordering::Equal);
        assert_eq!(cmp_creation_time(Some(1.0), Some(2.0)), Ordering::Less);
    }

    #[test]
    fn test_serialized_field_names() {
        let fp = Fingerprint::new("IMG_0001", Some(1.5), 10, 20, 42);
        let json = serde_json::to_string(&fp).unwrap();
        assert!(json.contains("\"localIdentifier\":\"IMG_0001\""));
        assert!(json.contains("\"creationTime\":1.5"));
        assert!(json.contains("\"dHash64\":42"));
        assert!(!json.contains("revision"));
    }

    #[test]
    fn test_index_without_revision_still_loads() {
        let json = r#"{"creationTime":null,"dHash64":7,"height":2,"localIdentifier":"a","width":3}"#;
        let fp: Fingerprint = serde_json::from_str(json).unwrap();
        assert_eq!(fp.revision, None);

        let marked = fp.with_revision(Some("1700000000000000000:42".to_string()));
        let json = serde_json::to_string(&marked).unwrap();
        assert!(json.contains("\"revision\":\"1700000000000000000:42\""));
    }
}
