//! JSON output formatter for detection reports.
//!
//! Provides machine-readable output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "id": "3f2a9c0d1e4b5a67",
//!       "hash": "00ff00ff00ff00ff",
//!       "keep": { "id": "2024/IMG_0001.jpg", "width": 4032, "height": 3024, "creation_time": "2024-03-01T12:00:00Z" },
//!       "duplicates": [
//!         { "id": "2024/IMG_0002.jpg", "width": 4032, "height": 3024, "creation_time": "2024-03-01T12:00:30Z", "estimated_bytes": 2400000 }
//!       ],
//!       "estimated_bytes": 2400000
//!     }
//!   ],
//!   "summary": {
//!     "fingerprints": 1200,
//!     "duplicate_groups": 1,
//!     "duplicate_assets": 1,
//!     "reclaimable_bytes": 2400000,
//!     "reclaimable_human": "2.3 MiB",
//!     "index_generated_at": "2024-03-02T08:00:00Z",
//!     "exit_code": 0,
//!     "exit_code_name": "PP000"
//!   }
//! }
//! ```

use std::io::Write;

use bytesize::ByteSize;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::duplicates::DuplicateGroup;
use crate::engine::DetectionReport;
use crate::error::ExitCode;
use crate::index::Fingerprint;

/// One asset in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonAsset {
    /// Asset identifier
    pub id: String,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Creation time in RFC 3339, if known
    pub creation_time: Option<String>,
    /// Reclaimable bytes; absent for the kept asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_bytes: Option<u64>,
}

impl JsonAsset {
    fn from_fingerprint(fp: &Fingerprint, estimated_bytes: Option<u64>) -> Self {
        Self {
            id: fp.id.to_string(),
            width: fp.width,
            height: fp.height,
            creation_time: fp.creation_time.and_then(format_timestamp),
            estimated_bytes,
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Group identifier
    pub id: String,
    /// Shared perceptual hash, 16 hex digits
    pub hash: String,
    /// The asset to keep
    pub keep: JsonAsset,
    /// Deletion candidates
    pub duplicates: Vec<JsonAsset>,
    /// Reclaimable bytes for the whole group
    pub estimated_bytes: Option<u64>,
}

impl JsonDuplicateGroup {
    /// Convert a group.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            id: group.id.to_string(),
            hash: format!("{:016x}", group.representative.hash),
            keep: JsonAsset::from_fingerprint(&group.representative, None),
            duplicates: group
                .duplicates
                .iter()
                .map(|d| JsonAsset::from_fingerprint(d, group.estimated_bytes_for(&d.id)))
                .collect(),
            estimated_bytes: group.estimated_bytes,
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Fingerprints examined
    pub fingerprints: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of deletion candidates
    pub duplicate_assets: usize,
    /// Total reclaimable bytes
    pub reclaimable_bytes: u64,
    /// Total reclaimable bytes, human readable
    pub reclaimable_human: String,
    /// When the index was generated
    pub index_generated_at: String,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "PP000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the output for a detection report.
    #[must_use]
    pub fn new(report: &DetectionReport, exit_code: ExitCode) -> Self {
        Self {
            duplicates: report
                .groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary {
                fingerprints: report.fingerprint_count,
                duplicate_groups: report.groups.len(),
                duplicate_assets: report.duplicate_count(),
                reclaimable_bytes: report.total_estimated_bytes,
                reclaimable_human: ByteSize::b(report.total_estimated_bytes).to_string(),
                index_generated_at: report
                    .index_generated_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn format_timestamp(seconds: f64) -> Option<String> {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Errors from JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// Serialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing failed.
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}
