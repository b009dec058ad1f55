//! Configuration file support for inklink.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/inklink/config.toml`. Settings cover the connection handshake,
//! real-time ink mapping, and where the remembered device is stored.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

pub use enums::StorageMode;
pub use types::{DeviceConfig, InkConfig, StorageConfig};

use crate::device::AppIdentity;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [device]
/// app_id = "fa:ab:c1:e0:f1:77"
/// require_confirmation = true
/// connect_timeout_ms = 30000
///
/// [ink]
/// max_pressure = 1.402218
/// surface_width = 1024
/// surface_height = 768
///
/// [storage]
/// mode = "auto"
/// ```
#[derive(Debug, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Connection handshake settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Real-time ink mapping
    #[serde(default)]
    pub ink: InkConfig,

    /// Remembered-device storage
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value (or replaced by the
    /// default) and a warning is logged.
    ///
    /// Validated ranges:
    /// - `connect_timeout_ms`: 1000 - 120000
    /// - `max_pressure`: above 1.0
    /// - `surface_width` / `surface_height`: 1.0 - 16384.0
    /// - `target_dpi`: 48.0 - 600.0
    fn validate_and_clamp(&mut self) {
        if self.device.app_id.parse::<AppIdentity>().is_err() {
            warn!(
                "Invalid app_id '{}', falling back to '{}'",
                self.device.app_id,
                AppIdentity::default()
            );
            self.device.app_id = AppIdentity::default().to_string();
        }

        if !(1_000..=120_000).contains(&self.device.connect_timeout_ms) {
            warn!(
                "Invalid connect_timeout_ms {}, clamping to 1000-120000 range",
                self.device.connect_timeout_ms
            );
            self.device.connect_timeout_ms = self.device.connect_timeout_ms.clamp(1_000, 120_000);
        }

        if !(self.ink.max_pressure > 1.0 && self.ink.max_pressure.is_finite()) {
            warn!(
                "Invalid max_pressure {}, falling back to {}",
                self.ink.max_pressure,
                crate::ink::DEFAULT_MAX_PRESSURE
            );
            self.ink.max_pressure = crate::ink::DEFAULT_MAX_PRESSURE;
        }

        for (name, value) in [
            ("surface_width", &mut self.ink.surface_width),
            ("surface_height", &mut self.ink.surface_height),
        ] {
            if !(1.0..=16_384.0).contains(&*value) {
                warn!("Invalid {name} {value:.1}, clamping to 1.0-16384.0 range");
                *value = if value.is_nan() {
                    1.0
                } else {
                    value.clamp(1.0, 16_384.0)
                };
            }
        }

        if !(48.0..=600.0).contains(&self.ink.target_dpi) {
            warn!(
                "Invalid target_dpi {:.1}, clamping to 48.0-600.0 range",
                self.ink.target_dpi
            );
            self.ink.target_dpi = if self.ink.target_dpi.is_nan() {
                96.0
            } else {
                self.ink.target_dpi.clamp(48.0, 600.0)
            };
        }

        if self.storage.mode == StorageMode::Custom
            && self
                .storage
                .custom_directory
                .as_deref()
                .is_none_or(|dir| dir.trim().is_empty())
        {
            warn!("storage.mode is 'custom' but custom_directory is empty, falling back to 'auto'");
            self.storage.mode = StorageMode::Auto;
        }
    }

    /// Parsed client identity. Always valid after loading.
    pub fn app_identity(&self) -> AppIdentity {
        self.device.app_id.parse().unwrap_or_default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.device.connect_timeout_ms)
    }

    /// JSON schema describing the config file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Returns the directory holding the configuration file
    /// (`~/.config/inklink`).
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not find config directory")?
            .join("inklink"))
    }

    /// Returns the path to the configuration file.
    ///
    /// The config file is located at `~/.config/inklink/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from file, or returns defaults if not found.
    ///
    /// All loaded values are validated and clamped to acceptable ranges.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory path cannot be determined
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// [`Config::load`] for an explicit path.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Creates a default configuration file with documentation comments.
    ///
    /// Writes the example config from `config.example.toml` to the user's config directory.
    ///
    /// # Errors
    /// Returns an error if:
    /// - A config file already exists at the target path
    /// - The config directory cannot be created
    /// - The file cannot be written
    pub fn create_default_file() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = include_str!("../../config.example.toml");
        fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }
}
