//! Configuration management
//!
//! Settings live in `<data_dir>/settings.json`:
//! ```json
//! {
//!   "upApi": {
//!     "baseUrl": "https://api.up.com.au/api/v1",
//!     "requestTimeoutSecs": 30,
//!     "maxPages": 10,
//!     "pageSize": 100,
//!     "recentPageSize": 25
//!   }
//! }
//! ```
//! Environment variables override the file. The encryption key normally
//! comes from `UP_TOKEN_ENCRYPTION_KEY` only.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::up_bank::{DEFAULT_TIMEOUT_SECS, UP_BASE_URL_ENV, UP_PRODUCTION_URL};
use crate::domain::result::Error;
use crate::services::pagination::{DEFAULT_MAX_PAGES, MAX_PAGE_SIZE};
use crate::services::resources::{FetchSettings, DEFAULT_RECENT_PAGE_SIZE};
use crate::services::vault::VaultKey;

/// Environment variable holding the hex-encoded 32-byte vault key
pub const ENCRYPTION_KEY_ENV: &str = "UP_TOKEN_ENCRYPTION_KEY";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "UPDASH_DIR";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    up_api: UpApiSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encryption_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recent_page_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// updash configuration
#[derive(Clone)]
pub struct Config {
    /// Hex vault key; never printed
    pub encryption_key: Option<String>,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub max_pages: u32,
    pub page_size: u32,
    pub recent_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encryption_key: None,
            api_base_url: UP_PRODUCTION_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_pages: DEFAULT_MAX_PAGES,
            page_size: MAX_PAGE_SIZE,
            recent_page_size: DEFAULT_RECENT_PAGE_SIZE,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("page_size", &self.page_size)
            .field("recent_page_size", &self.recent_page_size)
            .finish()
    }
}

impl Config {
    /// Load from `data_dir`, with process environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |name| std::env::var(name).ok())
    }

    /// Load from `data_dir`, reading overrides through `env`
    pub fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let up = &raw.up_api;
        let defaults = Config::default();

        let encryption_key = env(ENCRYPTION_KEY_ENV)
            .or_else(|| up.encryption_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let api_base_url = env(UP_BASE_URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .or_else(|| up.base_url.clone())
            .unwrap_or(defaults.api_base_url);

        Ok(Self {
            encryption_key,
            api_base_url,
            request_timeout_secs: up.request_timeout_secs.unwrap_or(defaults.request_timeout_secs),
            max_pages: up.max_pages.unwrap_or(defaults.max_pages),
            page_size: up.page_size.unwrap_or(defaults.page_size),
            recent_page_size: up.recent_page_size.unwrap_or(defaults.recent_page_size),
        })
    }

    /// Save to `data_dir`
    ///
    /// Keys updash does not manage are preserved. The encryption key is
    /// only written back if it was read from the file.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");
        let mut settings = read_settings(data_dir)?;

        let up = &mut settings.up_api;
        up.base_url = Some(self.api_base_url.clone());
        up.request_timeout_secs = Some(self.request_timeout_secs);
        up.max_pages = Some(self.max_pages);
        up.page_size = Some(self.page_size);
        up.recent_page_size = Some(self.recent_page_size);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    /// Check every setting; the first problem is returned as a config error
    ///
    /// Messages mention the key's length, never its content.
    pub fn validate(&self) -> std::result::Result<VaultKey, Error> {
        let key = match &self.encryption_key {
            Some(hex_key) => VaultKey::from_hex(hex_key)?,
            None => {
                return Err(Error::config(format!(
                    "{} is not set. Expected 64 hex characters (32 bytes).",
                    ENCRYPTION_KEY_ENV
                )))
            }
        };
        self.validate_settings()?;
        Ok(key)
    }

    /// Check everything except the encryption key
    pub fn validate_settings(&self) -> std::result::Result<(), Error> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::config("Up API base URL is empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("requestTimeoutSecs must be at least 1"));
        }
        if self.max_pages == 0 {
            return Err(Error::config("maxPages must be at least 1"));
        }
        for (name, size) in [("pageSize", self.page_size), ("recentPageSize", self.recent_page_size)] {
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(Error::config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_PAGE_SIZE, size
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            page_size: self.page_size,
            max_pages: self.max_pages,
            recent_page_size: self.recent_page_size,
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid settings file {}", settings_path.display()))
}

/// Data directory from `UPDASH_DIR`, or `~/.updash`
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".updash"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", DATA_DIR_ENV))
}
