//! Fingerprint index for photoprune.
//!
//! A scan reduces every image in the library to a [`Fingerprint`] and stores
//! the collection as a [`FingerprintIndex`]. Detection reads it back later,
//! possibly from a different process.
//!
//! # Architecture
//!
//! * [`entry`]: the fingerprint record and the [`AssetId`] newtype.
//! * [`store`]: versioned JSON persistence with atomic replacement.
//!
//! # Versioning
//!
//! The index carries a format version. A reader built for a different version
//! refuses the file with [`IndexError::VersionMismatch`]; no attempt is made to
//! interpret older or newer layouts.

pub mod entry;
pub mod store;

pub use entry::{cmp_creation_time, AssetId, Fingerprint};
pub use store::{FingerprintIndex, IndexError, IndexStore, FORMAT_VERSION, INDEX_FILE_NAME};
