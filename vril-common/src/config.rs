//! Configuration loading and resolution
//!
//! Server settings come from a TOML file with environment-variable
//! overrides and compiled defaults. The TMDb API key gets the full
//! three-tier treatment (Database → ENV → TOML) since it can be updated
//! at runtime through the settings store.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_DATA_DIR: &str = "VRIL_DATA_DIR";
pub const ENV_BIND_ADDRESS: &str = "VRIL_BIND_ADDRESS";
pub const ENV_DEBUG: &str = "VRIL_DEBUG";
pub const ENV_TMDB_API_KEY: &str = "VRIL_TMDB_API_KEY";

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";

/// Raw TOML config file contents
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root data folder (database + media assets)
    pub data_dir: Option<String>,
    /// Listen address, e.g. "127.0.0.1:5780"
    pub bind_address: Option<String>,
    /// Include timing metadata in API responses
    pub debug: Option<bool>,
    /// TMDb API key (tier 3; database and ENV take priority)
    pub tmdb_api_key: Option<String>,
    /// Seed username for the auth-token endpoint
    pub auth_username: Option<String>,
    /// Seed password for the auth-token endpoint
    pub auth_password: Option<String>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_address: String,
    pub debug: bool,
    pub toml: TomlConfig,
}

impl ServerConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vril.db")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}

/// Default config file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vril").join("config.toml"))
}

/// Load the TOML config file, tolerating its absence
pub fn load_toml_config(path: Option<&Path>) -> TomlConfig {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return TomlConfig::default(),
        },
    };

    if !path.exists() {
        return TomlConfig::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {} (using defaults)", path.display(), e);
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {} (using defaults)", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Resolve server configuration with ENV → TOML → default priority
pub fn resolve(toml: TomlConfig) -> ServerConfig {
    let data_dir = std::env::var(ENV_DATA_DIR)
        .ok()
        .map(PathBuf::from)
        .or_else(|| toml.data_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_data_dir);

    let bind_address = std::env::var(ENV_BIND_ADDRESS)
        .ok()
        .or_else(|| toml.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

    let debug = std::env::var(ENV_DEBUG)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .or(toml.debug)
        .unwrap_or(false);

    ServerConfig {
        data_dir,
        bind_address,
        debug,
        toml,
    }
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vril"))
        .unwrap_or_else(|| PathBuf::from("./vril_data"))
}

/// Resolve the TMDb API key from three-tier configuration
///
/// Priority: Database → ENV → TOML. A key present in multiple sources is
/// worth a warning since the lower-priority copies are silently ignored.
pub async fn resolve_tmdb_api_key(db: &SqlitePool, toml: &TomlConfig) -> Result<String> {
    let db_key = crate::db::settings::get_setting(db, "tmdb_api_key").await?;
    let env_key = std::env::var(ENV_TMDB_API_KEY).ok();
    let toml_key = toml.tmdb_api_key.clone();

    let mut sources = Vec::new();
    if db_key.as_deref().is_some_and(is_valid_key) {
        sources.push("database");
    }
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }
    if toml_key.as_deref().is_some_and(is_valid_key) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "TMDb API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (key, source) in [(db_key, "database"), (env_key, "environment"), (toml_key, "TOML")] {
        if let Some(key) = key {
            if is_valid_key(&key) {
                info!("TMDb API key loaded from {}", source);
                return Ok(key);
            }
        }
    }

    Err(Error::Config(
        "TMDb API key not configured. Set one of:\n\
         1. Settings store: key `tmdb_api_key`\n\
         2. Environment: VRIL_TMDB_API_KEY=your-key-here\n\
         3. TOML config: ~/.config/vril/config.toml (tmdb_api_key = \"your-key\")\n\
         \n\
         Obtain an API key at: https://www.themoviedb.org/settings/api"
            .to_string(),
    ))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_toml() {
        let raw = r#"
            data_dir = "/tmp/vril"
            bind_address = "0.0.0.0:8080"
            debug = true
            tmdb_api_key = "abc123"
            auth_username = "editor"
            auth_password = "hunter2"
        "#;

        let config: TomlConfig = toml::from_str(raw).expect("valid TOML");
        assert_eq!(config.data_dir.as_deref(), Some("/tmp/vril"));
        assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.debug, Some(true));
        assert_eq!(config.tmdb_api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_fields_default_to_none() {
        let config: TomlConfig = toml::from_str("debug = false").expect("valid TOML");
        assert!(config.data_dir.is_none());
        assert_eq!(config.debug, Some(false));
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let config = resolve(TomlConfig::default());
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert!(!config.debug);
    }

    #[test]
    fn toml_values_win_over_defaults() {
        let toml = TomlConfig {
            bind_address: Some("127.0.0.1:9999".to_string()),
            debug: Some(true),
            ..Default::default()
        };

        let config = resolve(toml);
        assert_eq!(config.bind_address, "127.0.0.1:9999");
        assert!(config.debug);
    }

    #[test]
    fn key_validation_rejects_blank() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
