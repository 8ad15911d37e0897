//! Application Configuration
//!
//! Manages droidrig settings:
//! - Android SDK location
//! - Emulator boot-wait tuning
//! - Defaults for new AVDs

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Emulator launch and boot-wait settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmulatorSettings {
    /// Give up waiting for boot after this many seconds
    pub boot_timeout_secs: u64,
    /// Delay between device list polls
    pub poll_interval_ms: u64,
    /// Consecutive offline polls before nudging adb to reconnect
    pub offline_retries: u32,
    /// Launch without a window
    pub headless: bool,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            boot_timeout_secs: 300,
            poll_interval_ms: 2000,
            offline_retries: 5,
            headless: false,
        }
    }
}

/// Defaults used when creating AVDs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AvdDefaults {
    /// Hardware profile passed to `avdmanager -d`
    pub default_device: String,
    /// System image tag (google_apis, google_apis_playstore, default)
    pub default_tag: String,
    /// System image ABI
    pub default_abi: String,
}

impl Default for AvdDefaults {
    fn default() -> Self {
        let abi = if cfg!(target_arch = "aarch64") {
            "arm64-v8a"
        } else {
            "x86_64"
        };
        Self {
            default_device: "pixel_6".to_string(),
            default_tag: "google_apis".to_string(),
            default_abi: abi.to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the Android SDK
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_root: Option<PathBuf>,
    /// Emulator settings
    pub emulator: EmulatorSettings,
    /// AVD creation defaults
    pub avd: AvdDefaults,
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "droidrig", "droidrig")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the default configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| CoreError::Config("Cannot determine config path".into()))?;
        Self::load_from(&config_file).await
    }

    /// Load configuration from a file, writing defaults if it does not exist
    pub async fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            toml::from_str(&contents).map_err(|source| CoreError::TomlParse {
                path: path.to_path_buf(),
                source,
            })
        } else {
            info!("Config file not found, using defaults");
            let config = AppConfig::default();
            config.save_to(path).await?;
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }
}
