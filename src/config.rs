//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file: `--config FILE`, else `config.toml` in the platform config
//!    directory (skipped when absent)
//! 3. `PHOTOPRUNE_*` environment variables, e.g. `PHOTOPRUNE_SCAN_THREADS=8`
//! 4. CLI flags, applied by the caller after loading
//!
//! # Example
//!
//! ```toml
//! creation_window_secs = 120
//! require_same_dimensions = false
//! scan_threads = 8
//! index_path = "/var/lib/photoprune/index.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DetectorConfig;
use crate::index::INDEX_FILE_NAME;
use crate::scanner::ScanConfig;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "PHOTOPRUNE_";

/// Name of the configuration file in the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong type.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The platform directories could not be determined.
    #[error("could not determine the user's config and data directories")]
    NoProjectDirs,

    /// Serializing the configuration failed.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Largest capture-time gap inside one duplicate group, in seconds.
    pub creation_window_secs: u64,
    /// Only group assets with identical pixel dimensions.
    pub require_same_dimensions: bool,
    /// Bytes per pixel assumed when a file size is unknown.
    pub jpeg_factor: f64,
    /// Edge length of the rendition hashed during scans.
    pub hash_target_size: u32,
    /// Edge length of review thumbnails.
    pub thumbnail_size: u32,
    /// Allow downloading remote originals while hashing.
    pub allow_network_for_hashing: bool,
    /// Hashing threads.
    pub scan_threads: usize,
    /// Reuse fingerprints of unchanged assets between scans.
    pub reuse_existing: bool,
    /// Index location; defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            creation_window_secs: 300,
            require_same_dimensions: true,
            jpeg_factor: 0.25,
            hash_target_size: 18,
            thumbnail_size: 120,
            allow_network_for_hashing: false,
            scan_threads: 4,
            reuse_existing: true,
            index_path: None,
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment, then validate.
    ///
    /// An explicit `config_file` must exist; the default one is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer cannot be read or parsed, or if
    /// the merged values fail [`validate`](Self::validate).
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()))
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(ref path) = file {
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.creation_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "creation_window_secs must be positive".to_string(),
            ));
        }
        if !(self.jpeg_factor.is_finite() && self.jpeg_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_factor must be a positive number, got {}",
                self.jpeg_factor
            )));
        }
        if self.hash_target_size == 0 {
            return Err(ConfigError::Invalid(
                "hash_target_size must be at least 1".to_string(),
            ));
        }
        if self.thumbnail_size == 0 {
            return Err(ConfigError::Invalid(
                "thumbnail_size must be at least 1".to_string(),
            ));
        }
        if self.scan_threads == 0 {
            return Err(ConfigError::Invalid(
                "scan_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Clustering window as a duration.
    #[must_use]
    pub fn creation_window(&self) -> Duration {
        Duration::from_secs(self.creation_window_secs)
    }

    /// Where the fingerprint index lives.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoProjectDirs`] when no path is configured and
    /// the platform data directory is unknown.
    pub fn resolved_index_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.index_path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join(INDEX_FILE_NAME))
            .ok_or(ConfigError::NoProjectDirs)
    }

    /// Clustering settings.
    #[must_use]
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig::default()
            .with_creation_window(self.creation_window())
            .with_require_same_dimensions(self.require_same_dimensions)
    }

    /// Scan settings, without cancel flag or progress callback.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_hash_target_size(self.hash_target_size)
            .with_network(self.allow_network_for_hashing)
            .with_threads(self.scan_threads)
            .with_reuse_existing(self.reuse_existing)
    }

    /// Render as TOML, suitable for a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if TOML encoding fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "photoprune", "photoprune")
}

/// Default config file location, if the platform has one.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with(ENV_PREFIX) {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.creation_window(), Duration::from_secs(300));
        assert_eq!(config.detector_config(), DetectorConfig::default());
        assert_eq!(config.scan_config().threads, 4);
    }

    #[test]
    fn test_load_file_and_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "scan_threads = 8\ncreation_window_secs = 60\n").unwrap();
        std::env::set_var("PHOTOPRUNE_SCAN_THREADS", "2");

        let config = Config::load(Some(&path)).unwrap();
        clear_env();

        assert_eq!(config.creation_window_secs, 60);
        assert_eq!(config.scan_threads, 2);
        assert!(config.require_same_dimensions);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            Config {
                creation_window_secs: 0,
                ..Config::default()
            },
            Config {
                jpeg_factor: 0.0,
                ..Config::default()
            },
            Config {
                jpeg_factor: f64::NAN,
                ..Config::default()
            },
            Config {
                scan_threads: 0,
                ..Config::default()
            },
            Config {
                thumbnail_size: 0,
                ..Config::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_index_path_override() {
        let config = Config {
            index_path: Some(PathBuf::from("/tmp/idx.json")),
            ..Config::default()
        };
        assert_eq!(
            config.resolved_index_path().unwrap(),
            PathBuf::from("/tmp/idx.json")
        );
    }

    #[test]
    fn test_to_toml() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("creation_window_secs = 300"));
        assert!(text.contains("jpeg_factor = 0.25"));
        assert!(!text.contains("index_path"));
    }
}
