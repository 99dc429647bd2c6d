//! File actions module.
//!
//! This module provides the deletion collaborator for the directory-backed
//! library:
//! - Move to system trash (default, recoverable)
//! - Permanent deletion (with confirmation)
//! - All-or-nothing batches: nothing is removed unless every asset resolves
//!
//! ```no_run
//! use photoprune::actions::{DeleteConfig, TrashDeleter};
//! use photoprune::library::FsLibrary;
//!
//! let deleter = TrashDeleter::new(FsLibrary::new("/photos"), DeleteConfig::trash());
//! ```

pub mod delete;

pub use delete::{DeleteConfig, DeleteError, TrashDeleter};
