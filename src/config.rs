//! Application configuration and data directories.
//!
//! Config lives in the platform app-data dir as JSON; the shard cache lives
//! beside it. CLI flags override loaded values. Resource policy is explicit
//! configuration, never runtime platform detection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "trq";
const CONFIG_FILE: &str = "config.json";

/// Persisted application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the corpus (hosts `meta.json` and `shard_{index}.json`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Accumulate the per-term frequency table during scans
    #[serde(default = "default_track_term_frequency")]
    pub track_term_frequency: bool,

    /// Read from / write back to the persistent shard cache
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Wrap query terms in word-boundary assertions by default
    #[serde(default = "default_whole_words")]
    pub whole_words: bool,
}

fn default_track_term_frequency() -> bool {
    true
}

fn default_cache_enabled() -> bool {
    true
}

fn default_whole_words() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            track_term_frequency: default_track_term_frequency(),
            cache_enabled: default_cache_enabled(),
            whole_words: default_whole_words(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return defaults.
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: AppConfig =
                serde_json::from_str(&content).context("Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory.
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the path to the config file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

/// Get the application data directory.
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Get the shard cache directory.
pub fn get_cache_dir() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join("shards"))
}
