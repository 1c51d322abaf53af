//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;
use usbdongle_hid::{DEFAULT_RECEIVE_TIMEOUT, UsbConfig};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Profile settings
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Database path (optional, uses default if not set)
    pub path: Option<PathBuf>,
}

/// Device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// How long to wait for each telemetry response
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    /// Raw volume change per hot-key press
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
    /// HID interface number, discovered if unset
    #[serde(default)]
    pub interface: Option<u8>,
    /// Interrupt IN endpoint address, discovered if unset
    #[serde(default)]
    pub endpoint_in: Option<u8>,
    /// Interrupt OUT endpoint address, discovered if unset
    #[serde(default)]
    pub endpoint_out: Option<u8>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: default_receive_timeout_ms(),
            volume_step: default_volume_step(),
            interface: None,
            endpoint_in: None,
            endpoint_out: None,
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    #[must_use]
    pub fn usb_config(&self) -> UsbConfig {
        UsbConfig {
            interface: self.interface,
            endpoint_in: self.endpoint_in,
            endpoint_out: self.endpoint_out,
            ..UsbConfig::default()
        }
    }
}

fn default_receive_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_RECEIVE_TIMEOUT.as_millis()).unwrap_or(1000)
}

fn default_volume_step() -> u8 {
    1
}

/// Profile settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesConfig {
    /// Profile applied once the dongle has been read at startup
    pub startup_profile: Option<String>,
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_path()?;

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        info!(?config_path, "Loaded config");
        Ok(config)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "usbdongle", "UsbDongleControl")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
