// src/config.rs
//! Configuration management

use crate::{
    error::{Result, TimeSyncError},
    gps::decoder::DEFAULT_REFERENCE_YEAR,
    sync::AcquisitionConfig,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

/// Whether a network time source is considered authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTimeMode {
    Enabled,
    Disabled,
    /// Ask systemd-timesyncd on every fix
    Detect,
}

impl FromStr for NetworkTimeMode {
    type Err = TimeSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enabled" => Ok(NetworkTimeMode::Enabled),
            "disabled" => Ok(NetworkTimeMode::Disabled),
            "detect" => Ok(NetworkTimeMode::Detect),
            other => Err(TimeSyncError::Config(format!(
                "Unknown network time mode '{}', expected enabled, disabled or detect",
                other
            ))),
        }
    }
}

impl fmt::Display for NetworkTimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkTimeMode::Enabled => write!(f, "enabled"),
            NetworkTimeMode::Disabled => write!(f, "disabled"),
            NetworkTimeMode::Detect => write!(f, "detect"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSyncConfig {
    pub source_type: String, // "serial", "gpsd"
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub retry_delay_secs: u64,
    pub fix_interval_secs: u64,
    pub reference_year: i32,
    pub auto_time: bool,
    pub auto_time_zone: bool,
    pub network_time: NetworkTimeMode,
    pub dry_run: bool,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            source_type: "gpsd".to_string(),
            serial_port: None,
            serial_baudrate: Some(9600),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(2947),
            retry_delay_secs: 10,
            fix_interval_secs: 10,
            reference_year: DEFAULT_REFERENCE_YEAR,
            auto_time: true,
            auto_time_zone: true,
            network_time: NetworkTimeMode::Detect,
            dry_run: false,
        }
    }
}

impl TimeSyncConfig {
    /// Load configuration from the config file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| TimeSyncError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_json(&contents)
    }

    /// Save configuration to the config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TimeSyncError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TimeSyncError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| TimeSyncError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| TimeSyncError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Config file path: `$HOME/.config/gps-timesync/config.json`
    pub fn get_config_path() -> Result<std::path::PathBuf> {
        use std::path::PathBuf;

        let home = std::env::var("HOME")
            .map_err(|_| TimeSyncError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("gps-timesync").join("config.json"))
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn fix_interval(&self) -> Duration {
        Duration::from_secs(self.fix_interval_secs)
    }

    /// Settings the acquisition controller runs with
    pub fn acquisition(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            retry_delay: self.retry_delay(),
            reference_year: self.reference_year,
        }
    }
}
