//! Integration tests for configuration loading and the token file source.
//!
//! These run against a temporary config directory selected via
//! `POCKETCORD_CONFIG_DIR`; a process-wide lock keeps the env mutations
//! from racing each other.

use std::env;
use std::fs;
use std::sync::Mutex;

use tempfile::TempDir;

use pocketcord::constants;
use pocketcord::Config;

// Global lock to prevent env var pollution between tests
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Points the config dir at a fresh temp dir and clears the overrides.
fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = ENV_LOCK.lock().unwrap();
    let temp_dir = TempDir::new().unwrap();

    env::remove_var("POCKETCORD_TOKEN");
    env::remove_var("POCKETCORD_BASE_URL");
    env::set_var("POCKETCORD_CONFIG_DIR", temp_dir.path());

    (temp_dir, guard)
}

#[test]
fn loads_defaults_when_no_config_file_exists() {
    let (_temp, _guard) = setup_test_env();

    let config = Config::load().unwrap();
    assert_eq!(config.base_url, constants::API_BASE_URL);
    assert!(!config.has_token());
}

#[test]
fn reads_trimmed_token_from_token_file() {
    let (temp, _guard) = setup_test_env();
    fs::write(temp.path().join("token.txt"), "  mfa.secret-token\n").unwrap();

    let config = Config::load().unwrap();
    assert_eq!(config.token, "mfa.secret-token");
}

#[test]
fn ignores_an_empty_token_file() {
    let (temp, _guard) = setup_test_env();
    fs::write(temp.path().join("token.txt"), "\n").unwrap();

    let config = Config::load().unwrap();
    assert!(!config.has_token());
}

#[test]
fn env_token_wins_over_token_file() {
    let (temp, _guard) = setup_test_env();
    fs::write(temp.path().join("token.txt"), "file-token\n").unwrap();
    env::set_var("POCKETCORD_TOKEN", "env-token");

    let config = Config::load().unwrap();
    assert_eq!(config.token, "env-token");

    env::remove_var("POCKETCORD_TOKEN");
}

#[test]
fn reads_base_url_from_config_file() {
    let (temp, _guard) = setup_test_env();
    fs::write(
        temp.path().join("config.json"),
        r#"{"base_url":"https://example.test/api"}"#,
    )
    .unwrap();

    let config = Config::load().unwrap();
    assert_eq!(config.base_url, "https://example.test/api");
}

#[test]
fn save_never_writes_the_token() {
    let (temp, _guard) = setup_test_env();

    let mut config = Config::load().unwrap();
    config.token = "super-secret".to_string();
    config.save().unwrap();

    let written = fs::read_to_string(temp.path().join("config.json")).unwrap();
    assert!(!written.contains("super-secret"));
    assert!(written.contains("base_url"));
}
