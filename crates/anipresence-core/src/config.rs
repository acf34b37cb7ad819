use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::PresenceError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level configuration shared by the page observer and the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub observer: ObserverConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Endpoint of the local relay, including the `/setRPC` path.
    pub relay_url: String,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Optional user service registry merged over the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_file: Option<PathBuf>,
}

impl ObserverConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub listen: String,
    pub discord_app_id: String,
    pub large_image_key: String,
    pub large_image_text: String,
}

impl AppConfig {
    /// Load config: user file (if exists) or the built-in defaults.
    pub fn load() -> Result<Self, PresenceError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            Self::load_from(&user_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, PresenceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PresenceError::Config(e.to_string()))?;
        toml::from_str(&content).map_err(|e| PresenceError::Config(e.to_string()))
    }

    /// Save current config to the given file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), PresenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PresenceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), PresenceError> {
        self.save_to(&Self::config_path())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "anipresence")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
