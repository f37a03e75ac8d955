//! TOML configuration for the driver.
//!
//! Example:
//!
//! ```toml
//! [driver]
//! log_level = "debug"
//! connect_timeout_secs = 10
//! settle_delay_ms = 1000
//!
//! [[devices]]
//! id = "1018009022"
//! name = "Theater"
//! address = "192.168.1.50"
//! port = 4999
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a file containing only a
//! `[[devices]]` list is valid, and an absent file yields
//! [`DriverConfig::default`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lumagen_core::{DeviceInfo, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The content parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level driver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    #[serde(default)]
    pub driver: DriverSettings,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverSettings {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on opening the transport.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Pause between connecting and the initial label refresh.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Port used by devices that do not set one.
    #[serde(default = "default_port")]
    pub default_port: u16,
}

/// One configured processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    /// Stable device id (model number + 6-digit serial).
    pub id: String,
    /// Display name; defaults to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Host name or IP of the IP-to-serial adapter.
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_settle_delay_ms() -> u64 {
    1000
}
fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            connect_timeout_secs: default_connect_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            default_port: default_port(),
        }
    }
}

impl DriverSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl DeviceEntry {
    /// Converts the entry to a [`DeviceInfo`], filling in the default port.
    pub fn to_device_info(&self, default_port: u16) -> DeviceInfo {
        DeviceInfo::configured(
            self.id.clone(),
            self.name.clone().unwrap_or_else(|| self.id.clone()),
            self.address.clone(),
            self.port.unwrap_or(default_port),
        )
    }
}

impl DriverConfig {
    /// Every configured device as a [`DeviceInfo`].
    pub fn device_infos(&self) -> Vec<DeviceInfo> {
        self.devices
            .iter()
            .map(|d| d.to_device_info(self.driver.default_port))
            .collect()
    }

    /// Checks the parts serde cannot: non-empty and unique ids, non-empty addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, device) in self.devices.iter().enumerate() {
            if device.id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("devices[{i}] has an empty id")));
            }
            if device.address.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("device {} has an empty address", device.id)));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::Invalid(format!("device {} is listed twice", device.id)));
            }
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] for unusable content.
pub fn parse_config(content: &str) -> Result<DriverConfig, ConfigError> {
    let cfg: DriverConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads the config at `path`, returning `DriverConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] / [`ConfigError::Invalid`] for bad content.
pub fn load_config(path: &Path) -> Result<DriverConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DriverConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
