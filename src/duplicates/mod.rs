//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Exact-hash clustering with dimension and capture-time rules
//! - Representative selection
//! - Reclaimable storage estimation
//! - Duplicate group management

pub mod estimate;
pub mod finder;
pub mod groups;

pub use estimate::{EstimateError, StorageEstimator, DEFAULT_JPEG_FACTOR};
pub use finder::{DetectorConfig, DuplicateDetector, DEFAULT_CREATION_WINDOW};
pub use groups::{estimated_bytes_for, total_estimated_bytes, DuplicateGroup, GroupId};
