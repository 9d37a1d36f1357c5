//! Configuration: serial link settings and monitor knobs.
//!
//! Settings live in an optional TOML file; missing fields take their
//! defaults, and the CLI can override individual values on top.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::window::ROWS_PER_SAMPLE;

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM9";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Serial link settings for the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port the PMD-USB is attached to.
    pub port: String,
    pub baudrate: u32,
    /// Data bits per character (5-8).
    pub bytesize: u8,
    /// Stop bits (1 or 2).
    pub stopbits: u8,
    /// Read timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.into(),
            baudrate: 115_200,
            bytesize: 8,
            stopbits: 1,
            timeout_ms: 1000,
        }
    }
}

/// Polling, windowing and export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Window capacity in flattened rows (samples x rails x metrics).
    pub max_length: usize,
    /// Delay between poll attempts in milliseconds.
    pub poll_period_ms: u64,
    /// CSV log destination, appended to across runs.
    pub csv_path: String,
    pub csv_enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_length: 1000,
            poll_period_ms: 100,
            csv_path: "measurements.csv".into(),
            csv_enabled: true,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("configuration loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => warn!("failed to parse {}: {}", path.display(), e),
                },
                Err(e) => warn!("failed to read {}: {}", path.display(), e),
            }
        }
        info!("using default configuration");
        AppConfig::default()
    }

    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.device.port.is_empty() {
            errors.push("device port must not be empty".into());
        }
        if self.device.baudrate == 0 {
            errors.push("baudrate must not be 0".into());
        }
        if !(5..=8).contains(&self.device.bytesize) {
            errors.push(format!(
                "bytesize must be 5-8, got {}",
                self.device.bytesize
            ));
        }
        if !(1..=2).contains(&self.device.stopbits) {
            errors.push(format!(
                "stopbits must be 1 or 2, got {}",
                self.device.stopbits
            ));
        }
        if self.device.timeout_ms == 0 {
            errors.push("timeout_ms must not be 0".into());
        }
        if self.monitor.max_length < ROWS_PER_SAMPLE {
            errors.push(format!(
                "max_length must hold at least one sample ({} rows), got {}",
                ROWS_PER_SAMPLE, self.monitor.max_length
            ));
        }

        errors
    }
}
