// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Matthias Bilger <matthias@bilger.info>

//! Configuration for the Wiimote bridge
//!
//! Configuration files are searched in the following order:
//! 1. Path given on the command line
//! 2. Current directory (wiimote-uinput.yaml)
//! 3. User's config directory (~/.config/wiimote-uinput/wiimote-uinput.yaml)
//!
//! If no configuration file is found the built-in defaults are used.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wiimote_hid::{WIIMOTE_PLUS_PRODUCT_ID, WIIMOTE_PRODUCT_ID, WIIMOTE_VENDOR_ID};

pub const CONFIG_FILE_NAME: &str = "wiimote-uinput.yaml";
const CONFIG_DIR_NAME: &str = "wiimote-uinput";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_device_identifications")]
    pub device_identifications: Vec<DeviceIdentification>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reactor: ReactorConfig,
    #[serde(default)]
    pub virtual_device: VirtualDeviceConfig,
}

/// Device identification (vendor ID, product ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentification {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Per-module overrides, e.g. `wiimote_hid: debug`
    #[serde(default)]
    pub submodules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            submodules: HashMap::new(),
        }
    }
}

/// Event loop tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorConfig {
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Ask the controller to report every 10ms instead of only on change
    #[serde(default)]
    pub continuous_reporting: bool,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: default_poll_timeout_secs(),
            max_events: default_max_events(),
            continuous_reporting: false,
        }
    }
}

impl ReactorConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// Identity of the virtual gamepads created for each controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualDeviceConfig {
    #[serde(default = "default_virtual_name")]
    pub name: String,
    #[serde(default = "default_virtual_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_virtual_product_id")]
    pub product_id: u16,
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            name: default_virtual_name(),
            vendor_id: default_virtual_vendor_id(),
            product_id: default_virtual_product_id(),
        }
    }
}

fn default_device_identifications() -> Vec<DeviceIdentification> {
    vec![
        DeviceIdentification {
            vendor_id: WIIMOTE_VENDOR_ID,
            product_id: WIIMOTE_PRODUCT_ID,
        },
        DeviceIdentification {
            vendor_id: WIIMOTE_VENDOR_ID,
            product_id: WIIMOTE_PLUS_PRODUCT_ID,
        },
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_max_events() -> usize {
    10
}

fn default_virtual_name() -> String {
    "Wiimote uinput".to_string()
}

// Xbox 360 pad ids, picked up by most games without extra mapping
fn default_virtual_vendor_id() -> u16 {
    0x045e
}

fn default_virtual_product_id() -> u16 {
    0x028e
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_identifications: default_device_identifications(),
            logging: LoggingConfig::default(),
            reactor: ReactorConfig::default(),
            virtual_device: VirtualDeviceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load the explicit file if given, otherwise search the default locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::load_with_name(CONFIG_FILE_NAME),
        }
    }

    /// Find and load configuration file with a specific filename
    pub fn load_with_name(filename: &str) -> Result<Self> {
        for path in Self::config_search_paths(filename) {
            if path.exists() {
                info!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }
        debug!("No {} found, using defaults", filename);
        Ok(Self::default())
    }

    fn config_search_paths(filename: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(filename)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(CONFIG_DIR_NAME).join(filename));
        }
        paths
    }

    /// Supported (vendor, product) pairs
    pub fn device_ids(&self) -> Vec<(u16, u16)> {
        self.device_identifications
            .iter()
            .map(|id| (id.vendor_id, id.product_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_paths_start_with_cwd() {
        let paths = Config::config_search_paths(CONFIG_FILE_NAME);

        assert_eq!(paths[0], PathBuf::from(CONFIG_FILE_NAME));
        if paths.len() > 1 {
            assert!(paths[1].ends_with("wiimote-uinput/wiimote-uinput.yaml"));
        }
    }
}
