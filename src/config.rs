use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Public origin of the site, used for canonical URLs and sitemaps
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Bearer token for admin endpoints; auth is disabled when unset
    pub admin_token: Option<String>,

    #[serde(default = "default_sitemap_max_age_hours")]
    pub sitemap_max_age_hours: i64,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bpharm-seo");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("content.db").to_string_lossy().to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_sitemap_max_age_hours() -> i64 {
    24
}

fn default_event_buffer() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            base_url: default_base_url(),
            listen_addr: default_listen_addr(),
            admin_token: None,
            sitemap_max_age_hours: default_sitemap_max_age_hours(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_url = normalize_base_url(&config.base_url)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bpharm-seo")
            .join("config.toml")
    }
}

/// Validate the site origin and drop any trailing slash so paths can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("invalid base_url {:?}: {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "base_url must be http or https, got {}",
            parsed.scheme()
        )));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
