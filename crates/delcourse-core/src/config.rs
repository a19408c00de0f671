//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL and the last used email address.
//!
//! Configuration is stored at `~/.config/delcourse/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "delcourse";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE: &str = "https://open-api.delcom.org/api/v1";

/// Origin used to resolve relative asset paths when the API base cannot be parsed
const FALLBACK_ASSET_ORIGIN: &str = "https://open-api.delcom.org";

/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "DELCOURSE_API_BASE";

/// Environment variable selecting the OS keychain for the session (`1` to enable)
pub const USE_KEYRING_ENV: &str = "DELCOURSE_USE_KEYRING";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// API base URL: explicit override, then the config file, then the default.
    pub fn api_base(&self, override_base: Option<&str>) -> String {
        override_base
            .or(self.api_base.as_deref())
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string()
    }

    /// Origin that relative cover and photo paths are resolved against.
    pub fn asset_origin(&self, override_base: Option<&str>) -> String {
        asset_origin_for(&self.api_base(override_base))
    }
}

/// Scheme, host and port of an API base URL.
pub fn asset_origin_for(api_base: &str) -> String {
    match Url::parse(api_base) {
        Ok(url) if url.has_host() => url.origin().ascii_serialization(),
        _ => FALLBACK_ASSET_ORIGIN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_precedence() {
        let config = Config {
            api_base: Some("http://localhost:8000/api/v1/".to_string()),
            last_email: None,
        };
        assert_eq!(config.api_base(None), "http://localhost:8000/api/v1");
        assert_eq!(
            config.api_base(Some("https://staging.example.com/api")),
            "https://staging.example.com/api"
        );
        assert_eq!(Config::default().api_base(None), DEFAULT_API_BASE);
        assert_eq!(Config::default().api_base(Some("  ")), DEFAULT_API_BASE);
    }

    #[test]
    fn test_asset_origin() {
        assert_eq!(
            asset_origin_for(DEFAULT_API_BASE),
            "https://open-api.delcom.org"
        );
        assert_eq!(
            asset_origin_for("http://localhost:8000/api/v1"),
            "http://localhost:8000"
        );
        assert_eq!(asset_origin_for("not a url"), FALLBACK_ASSET_ORIGIN);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        assert!(Config::load_from(&path).expect("missing file is default").last_email.is_none());

        let config = Config {
            api_base: None,
            last_email: Some("ani@example.com".to_string()),
        };
        config.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.last_email.as_deref(), Some("ani@example.com"));
    }

    #[test]
    fn test_corrupt_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").expect("write");
        assert!(Config::load_from(&path).is_err());
    }
}
