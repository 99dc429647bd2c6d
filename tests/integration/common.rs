//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, Luma};
use photoprune::actions::{DeleteConfig, TrashDeleter};
use photoprune::engine::Engine;
use photoprune::index::IndexStore;
use photoprune::library::FsLibrary;
use tempfile::TempDir;

/// Brightness pattern of a synthetic photo.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// Dark on the left, bright on the right
    Rising,
    /// Bright on the left, dark on the right
    Falling,
    /// Bright in the middle column, dark at both edges
    Peak,
}

/// Write a grayscale PNG with `pattern` at `path`, creating parent dirs.
pub fn write_photo(path: &Path, width: u32, height: u32, pattern: Pattern) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let span = width.saturating_sub(1).max(1) as f32;
    let img = GrayImage::from_fn(width, height, |x, _| {
        let t = x as f32 / span;
        let value = match pattern {
            Pattern::Rising => t,
            Pattern::Falling => 1.0 - t,
            Pattern::Peak => 1.0 - (2.0 * t - 1.0).abs(),
        };
        Luma([(value * 255.0).round() as u8])
    });
    img.save(path).unwrap();
}

/// A temporary library plus an index location outside of it.
pub struct Fixture {
    pub library: TempDir,
    pub data: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            library: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.library.path()
    }

    pub fn index_path(&self) -> PathBuf {
        self.data.path().join("photo_fingerprints.json")
    }

    pub fn photo(&self, relative: &str, width: u32, height: u32, pattern: Pattern) -> PathBuf {
        let path = self.root().join(relative);
        write_photo(&path, width, height, pattern);
        path
    }

    /// Engine over the fixture with permanent deletion so tests never touch
    /// the desktop trash.
    pub fn engine(&self) -> Engine {
        let library = FsLibrary::new(self.root());
        let deleter = TrashDeleter::new(library.clone(), DeleteConfig::permanent());
        Engine::new(
            Arc::new(library.clone()),
            Arc::new(deleter),
            Arc::new(library),
            IndexStore::new(self.index_path()),
        )
    }
}
