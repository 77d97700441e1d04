//! Configuration loading and persistence.
//!
//! Reads and writes the pocketcord configuration file. The auth token is
//! never serialized alongside the config; it comes from the environment or
//! from a token file in the config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{fs, path::PathBuf};

use crate::constants;

/// Configuration for the pocketcord CLI.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Base URL of the chat service REST API.
    pub base_url: String,
    /// Auth token - NOT serialized to disk (read from env or token file).
    #[serde(skip)]
    pub token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: constants::API_BASE_URL.to_string(),
            token: String::new(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `POCKETCORD_CONFIG_DIR` overrides the platform config dir (useful
    /// for tests and sandboxed runs).
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("POCKETCORD_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("pocketcord")
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    /// The token is read from `POCKETCORD_TOKEN` or, failing that, from
    /// the token file.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_else(|_| Self::default());
        config.apply_env_overrides();

        if config.token.is_empty() {
            if let Some(token) = Self::load_token_file()? {
                config.token = token;
            }
        }

        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            anyhow::bail!("Config file not found")
        }
    }

    /// Reads `token.txt` from the config dir, trimmed of surrounding
    /// whitespace. Returns Ok(None) when the file does not exist or is
    /// empty.
    fn load_token_file() -> Result<Option<String>> {
        let path = Self::config_dir()?.join("token.txt");
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read token file {}", path.display()))?;
        let token = raw.trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("POCKETCORD_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(token) = std::env::var("POCKETCORD_TOKEN") {
            self.token = token;
        }
    }

    /// Persists the current configuration to disk. The token is never
    /// written here.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        // Owner read/write only.
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Check if a token is available for this session.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, constants::API_BASE_URL);
        assert!(config.token.is_empty());
        assert!(!config.has_token());
    }

    #[test]
    fn test_config_serialization_excludes_token() {
        let mut config = Config::default();
        config.token = "secret_token".to_string();
        let json = serde_json::to_string(&config).unwrap();

        // Token must NOT be in the JSON.
        assert!(!json.contains("secret_token"));
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_has_token() {
        let mut config = Config::default();
        assert!(!config.has_token());

        config.token = "mfa.abc123".to_string();
        assert!(config.has_token());
    }
}
