//! Client configuration.
//!
//! Values come from `<config_dir>/zuno/config.json` and are then overridden by
//! environment variables:
//! - `ZUNO_API_URL` - Base URL of the task/grading service (default: `http://127.0.0.1:8080`)
//! - `ZUNO_AUTH_URL` - Base URL of the identity and goal storage provider
//! - `ZUNO_ANON_KEY` - Public API key sent to the identity provider

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "zuno";
const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

/// Default URL for local development.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Task/grading service base URL.
    pub api_url: String,
    /// Identity provider base URL. Goals are stored under `<auth_url>/rest/v1`.
    pub auth_url: Option<String>,
    pub anon_key: Option<String>,
    /// How long an unread feedback result stays in the transfer slot.
    pub feedback_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: None,
            anon_key: None,
            feedback_ttl_secs: 600,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides. Falls back to defaults if the file is missing or
    /// fails to parse.
    pub fn load() -> Self {
        let config = match get_config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save the current configuration to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("ZUNO_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = var("ZUNO_AUTH_URL") {
            self.auth_url = Some(url);
        }
        if let Some(key) = var("ZUNO_ANON_KEY") {
            self.anon_key = Some(key);
        }
        self
    }

    pub fn feedback_ttl(&self) -> Duration {
        Duration::from_secs(self.feedback_ttl_secs)
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

/// Where the CLI keeps the live session between invocations.
pub fn default_session_path() -> Result<PathBuf> {
    let mut path =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    path.push(APP_NAME);
    path.push(SESSION_FILE);
    Ok(path)
}
