//! Config file discovery and loading
//!
//! Uses serial_test because the discovery tests point XDG_CONFIG_HOME at a
//! temporary directory.

use std::env;
use std::fs;
use std::path::PathBuf;

use mope_common::config::{default_config_path, TomlConfig};
use mope_common::Error;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_load_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mope.toml");
    fs::write(&path, "port = 16000\nmusic_root = \"/music\"\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.port, Some(16000));
    assert_eq!(config.music_root, Some(PathBuf::from("/music")));
}

#[test]
fn test_missing_explicit_path_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = TomlConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_explicit_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "port = [").unwrap();

    let err = TomlConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_user_config_dir_is_discovered() {
    let dir = TempDir::new().unwrap();
    let mope_dir = dir.path().join("mope");
    fs::create_dir_all(&mope_dir).unwrap();
    fs::write(mope_dir.join("config.toml"), "host = \"blue\"\n").unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let found = default_config_path();
    let config = TomlConfig::load(None).unwrap();

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(found, Some(mope_dir.join("config.toml")));
    assert_eq!(config.host.as_deref(), Some("blue"));
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_no_config_anywhere_yields_empty_config() {
    if PathBuf::from("/etc/mope/config.toml").exists() {
        return;
    }
    let dir = TempDir::new().unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = TomlConfig::load(None);

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    let config = config.unwrap();
    assert!(config.host.is_none());
    assert!(config.port.is_none());
}
