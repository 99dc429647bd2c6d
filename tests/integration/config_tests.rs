use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use photoprune::config::{Config, ConfigError, ENV_PREFIX};
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
fn test_config_load_defaults() {
    // Figment without Env so parallel tests cannot interfere
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.creation_window_secs, 300);
    assert!(config.require_same_dimensions);
    assert_eq!(config.scan_threads, 4);
    assert_eq!(config.hash_target_size, 18);
    assert_eq!(config.index_path, None);
}

#[test]
fn test_config_load_from_env() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("PHOTOPRUNE_CREATION_WINDOW_SECS", "45");
    std::env::set_var("PHOTOPRUNE_REQUIRE_SAME_DIMENSIONS", "false");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .unwrap();
    clear_env();

    assert_eq!(config.creation_window(), Duration::from_secs(45));
    assert!(!config.require_same_dimensions);
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
jpeg_factor = 0.5
thumbnail_size = 200
allow_network_for_hashing = true
index_path = "/srv/photos/index.json"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.jpeg_factor, 0.5);
    assert_eq!(config.thumbnail_size, 200);
    assert!(config.allow_network_for_hashing);
    assert_eq!(
        config.resolved_index_path().unwrap(),
        PathBuf::from("/srv/photos/index.json")
    );
    assert!(config.scan_config().allow_network);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "scan_threads = 8\n").unwrap();
    std::env::set_var("PHOTOPRUNE_SCAN_THREADS", "3");

    let config = Config::load(Some(&path));
    clear_env();
    assert_eq!(config.unwrap().scan_threads, 3);
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "creation_window_secs = 0\n").unwrap();

    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_wrong_type_is_a_load_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "scan_threads = \"many\"\n").unwrap();

    assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Load(_))));
}

#[test]
fn test_toml_output_round_trips() {
    let config = Config {
        creation_window_secs: 90,
        scan_threads: 2,
        ..Config::default()
    };
    let text = config.to_toml().unwrap();

    let parsed: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string(&text))
        .extract()
        .unwrap();
    assert_eq!(parsed, config);
}
