use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::DEFAULT_IMAGE_BASE_URL;

/// Main configuration structure
///
/// Loaded from the config file, then environment overrides, then whatever
/// the CLI passes. Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub favorites: FavoritesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load config from default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&contents)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("CINEFAV_TMDB_API_KEY") {
            if !key.trim().is_empty() {
                self.catalog.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("CINEFAV_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend.url = url;
            }
        }
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("cinefav")
            .join("config.toml"))
    }

    /// Where the SQLite database lives unless the config says otherwise
    pub fn database_path(&self) -> crate::Result<PathBuf> {
        if let Some(ref path) = self.cache.db_path {
            return Ok(path.clone());
        }

        Ok(dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("cinefav")
            .join("cinefav.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TMDB v3 API key
    /// Get one at https://www.themoviedb.org/settings/api
    pub api_key: Option<String>,

    #[serde(default = "default_catalog_url")]
    pub api_url: String,

    /// TMDB genre id passed to discover (16 = Animation)
    #[serde(default = "default_genre")]
    pub genre: Option<String>,

    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Titles that never make it into the browse list
    #[serde(default = "default_excluded_titles")]
    pub excluded_titles: Vec<String>,
}

fn default_catalog_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_genre() -> Option<String> {
    Some("16".to_string())
}

fn default_image_base_url() -> String {
    DEFAULT_IMAGE_BASE_URL.to_string()
}

fn default_excluded_titles() -> Vec<String> {
    vec![crate::pager::EXCLUDED_TITLE.to_string()]
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_catalog_url(),
            genre: default_genre(),
            image_base_url: default_image_base_url(),
            excluded_titles: default_excluded_titles(),
        }
    }
}

impl CatalogConfig {
    pub fn require_api_key(&self) -> crate::Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                crate::Error::ConfigError(
                    "No TMDB API key configured (set catalog.api_key or CINEFAV_TMDB_API_KEY)"
                        .into(),
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
}

fn default_backend_url() -> String {
    "https://app-backend-2l6q.onrender.com".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long catalog details stay cached, in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u64,

    /// Override for the SQLite file location
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_cache_ttl() -> u64 {
    24
}

impl CacheConfig {
    /// `ttl_hours` as a duration; absurdly large values mean "never expire"
    pub fn ttl(&self) -> chrono::Duration {
        crate::providers::cached::ttl_from_hours(self.ttl_hours)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_cache_ttl(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// Catalog lookups in flight at once while enriching favorites
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

fn default_enrich_concurrency() -> usize {
    8
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Leave the bearer token on disk after logout. Only the token stays;
    /// with the profile gone every authenticated call still reports
    /// signed out, and the next sign-in replaces the token.
    #[serde(default)]
    pub keep_token_on_logout: bool,
}
