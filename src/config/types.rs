//! Configuration type definitions.

use super::enums::StorageMode;
use crate::device::identity::DEFAULT_APP_IDENTITY;
use crate::ink::DEFAULT_MAX_PRESSURE;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Connection settings.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeviceConfig {
    /// Client identity presented to the pad when connecting, as 12 hex digits
    /// (separators `:` and `-` are accepted). Pads remember the identity they
    /// were paired with, so changing it forces a fresh confirmation.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Ask the user to tap the pad's button before a new pairing is accepted
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,

    /// How long to wait for the pad to answer a connect request, in
    /// milliseconds (valid range: 1000 - 120000)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            require_confirmation: default_require_confirmation(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Real-time ink settings.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InkConfig {
    /// Raw pressure value that maps to full pressure (must be above 1.0)
    #[serde(default = "default_max_pressure")]
    pub max_pressure: f32,

    /// Initial render surface width in logical units
    #[serde(default = "default_surface_width")]
    pub surface_width: f32,

    /// Initial render surface height in logical units
    #[serde(default = "default_surface_height")]
    pub surface_height: f32,

    /// Logical units per inch used for the page transform (valid range: 48 - 600)
    #[serde(default = "default_target_dpi")]
    pub target_dpi: f32,
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            max_pressure: default_max_pressure(),
            surface_width: default_surface_width(),
            surface_height: default_surface_height(),
            target_dpi: default_target_dpi(),
        }
    }
}

/// Remembered-device storage settings.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// Which directory holds `last-device.json`
    #[serde(default)]
    pub mode: StorageMode,

    /// Directory used when `mode = "custom"`; `~` is expanded
    #[serde(default)]
    pub custom_directory: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Auto,
            custom_directory: None,
        }
    }
}

fn default_app_id() -> String {
    DEFAULT_APP_IDENTITY.to_string()
}

fn default_require_confirmation() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}

fn default_max_pressure() -> f32 {
    DEFAULT_MAX_PRESSURE
}

fn default_surface_width() -> f32 {
    1024.0
}

fn default_surface_height() -> f32 {
    768.0
}

fn default_target_dpi() -> f32 {
    96.0
}
