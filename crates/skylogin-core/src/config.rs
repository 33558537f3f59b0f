//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the PDS service URL and the last identifier that signed in.
//!
//! Configuration is stored at `~/.config/skylogin/config.json`. The
//! `SKYLOGIN_SERVICE` and `SKYLOGIN_IDENTIFIER` environment variables
//! override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_SERVICE_URL;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "skylogin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const SERVICE_ENV: &str = "SKYLOGIN_SERVICE";
pub const IDENTIFIER_ENV: &str = "SKYLOGIN_IDENTIFIER";

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default)]
    pub last_identifier: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            last_identifier: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment overrides, looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(service) = lookup(SERVICE_ENV).filter(|s| !s.is_empty()) {
            self.service_url = service;
        }
        if let Some(identifier) = lookup(IDENTIFIER_ENV).filter(|s| !s.is_empty()) {
            self.last_identifier = Some(identifier);
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.service_url, "https://bsky.social");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            service_url: "https://pds.example.com".to_string(),
            last_identifier: Some("alice.test".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"last_identifier":"bob.test"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.last_identifier.as_deref(), Some("bob.test"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            SERVICE_ENV => Some("http://localhost:2583".to_string()),
            IDENTIFIER_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.service_url, "http://localhost:2583");
        assert_eq!(config.last_identifier, None);
    }
}
