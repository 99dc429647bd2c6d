//! Versioned, atomically persisted fingerprint index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::entry::Fingerprint;

/// Version of the index format this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// File name of the index inside the data directory.
pub const INDEX_FILE_NAME: &str = "photo_fingerprints.json";

/// Errors that can occur while reading or writing the fingerprint index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index has ever been saved at this location.
    #[error("no fingerprint index at {0}")]
    NotFound(PathBuf),

    /// The index is readable but was produced by an incompatible scanner.
    #[error("fingerprint index version {found} does not match supported version {expected}")]
    VersionMismatch {
        /// Version recorded in the file
        found: u64,
        /// Version this build supports
        expected: u32,
    },

    /// The index bytes could not be interpreted.
    #[error("fingerprint index at {path} is corrupt: {reason}")]
    Corrupt {
        /// Index location
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Filesystem failure while reading or writing.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Index location
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Persisted collection of fingerprints produced by one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintIndex {
    /// Format version.
    #[serde(rename = "formatVersion")]
    pub format_version: u32,
    /// When the index was generated.
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    /// Fingerprints in enumeration order.
    pub fingerprints: Vec<Fingerprint>,
}

impl FingerprintIndex {
    /// Create an index stamped with the current version and time.
    #[must_use]
    pub fn new(fingerprints: Vec<Fingerprint>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            generated_at: Utc::now(),
            fingerprints,
        }
    }

    /// Number of fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    /// Check if the index holds no fingerprints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Owner of the on-disk index file.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// Create a store for the index at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the index file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether an index has been saved.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the index atomically.
    ///
    /// The JSON is written to a temporary file next to the target and renamed
    /// over it, so readers see either the old index or the new one.
    pub fn save(&self, index: &FingerprintIndex) -> Result<(), IndexError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| self.io_error(e))?;

        // Going through `Value` sorts object keys.
        let value = serde_json::to_value(index).map_err(|e| self.corrupt(e))?;
        let json = serde_json::to_string_pretty(&value).map_err(|e| self.corrupt(e))?;

        let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| self.io_error(e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        log::debug!(
            "Saved {} fingerprints to {}",
            index.fingerprints.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Load the index, rejecting incompatible versions before decoding the payload.
    pub fn load(&self) -> Result<FingerprintIndex, IndexError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(IndexError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e))?;

        let found = value
            .get("formatVersion")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| IndexError::Corrupt {
                path: self.path.clone(),
                reason: "missing formatVersion".to_string(),
            })?;
        if found != u64::from(FORMAT_VERSION) {
            return Err(IndexError::VersionMismatch {
                found,
                expected: FORMAT_VERSION,
            });
        }

        let index: FingerprintIndex = serde_json::from_value(value).map_err(|e| self.corrupt(e))?;
        log::debug!(
            "Loaded {} fingerprints generated at {}",
            index.fingerprints.len(),
            index.generated_at
        );
        Ok(index)
    }

    /// Delete the index file if present.
    pub fn remove(&self) -> Result<(), IndexError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: io::Error) -> IndexError {
        IndexError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, err: serde_json::Error) -> IndexError {
        IndexError::Corrupt {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}
