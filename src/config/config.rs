//! Sitecraft configuration management
//! Handles loading and saving the config file

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::preview::{PreviewOptions, DEFAULT_TAILWIND_CDN};

/// Sitecraft configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generation endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer credential; `SITECRAFT_API_TOKEN` wins when set
    #[serde(default)]
    pub api_token: String,

    /// Database path
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// Conversation turns sent with each request
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub preview: PreviewConfig,
}

fn default_api_url() -> String {
    "http://localhost:8787/api/generate".to_string()
}

fn default_db_path() -> String {
    "~/.sitecraft/sitecraft.db".to_string()
}

fn default_history_limit() -> usize {
    20
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: String::new(),
            database_path: default_db_path(),
            history_limit: default_history_limit(),
            connect_timeout_secs: default_connect_timeout(),
            preview: PreviewConfig::default(),
        }
    }
}

/// Preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_tailwind_cdn")]
    pub tailwind_cdn: String,
    /// Minimum gap between live preview recompiles
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_route")]
    pub default_route: String,
}

fn default_tailwind_cdn() -> String {
    DEFAULT_TAILWIND_CDN.to_string()
}

fn default_interval_ms() -> u64 {
    250
}

fn default_route() -> String {
    "/".to_string()
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tailwind_cdn: default_tailwind_cdn(),
            interval_ms: default_interval_ms(),
            default_route: default_route(),
        }
    }
}

impl PreviewConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn options(&self) -> PreviewOptions {
        PreviewOptions {
            tailwind_cdn: self.tailwind_cdn.clone(),
            ..PreviewOptions::default()
        }
    }
}

impl Config {
    /// Load config from the default location or specified path
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&raw).context("Failed to parse config file")?;

        debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the config file path
    pub fn config_path(path: Option<&str>) -> Result<PathBuf> {
        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        if let Ok(env_path) = std::env::var("SITECRAFT_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".sitecraft").join("config.yml"))
    }

    /// Credential for the generation endpoint, if any
    pub fn api_token(&self) -> Option<String> {
        std::env::var("SITECRAFT_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.api_token.clone()).filter(|t| !t.trim().is_empty()))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Resolve database path (expand ~)
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match self.database_path.strip_prefix('~') {
            Some(rest) => {
                let home = dirs::home_dir().context("Cannot find home directory")?;
                Ok(home.join(rest.trim_start_matches('/')))
            }
            None => Ok(PathBuf::from(&self.database_path)),
        }
    }
}
