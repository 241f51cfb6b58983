//! Application configuration management.
//!
//! Holds the feed URL, the HTTP timeout and an optional cache directory
//! override. Configuration is stored at `~/.config/pricecache/config.json`;
//! a missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "pricecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured feed URL
pub const FEED_URL_ENV: &str = "PRICECACHE_FEED_URL";

/// Remote price table. Versionless: the whole table lives at one fixed URL.
pub const DEFAULT_FEED_URL: &str =
    "https://raw.githubusercontent.com/mohamedkam000/prices/main/data.json";

/// HTTP request timeout in seconds.
/// A refresh has no timeout of its own, so this bounds it.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read the config at `path`; a missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(FEED_URL_ENV) {
            if !url.trim().is_empty() {
                self.feed_url = Some(url);
            }
        }
        self
    }

    pub fn feed_url(&self) -> &str {
        self.feed_url.as_deref().unwrap_or(DEFAULT_FEED_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
