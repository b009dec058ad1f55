//! Settings shared by everything a session creates.

use std::time::Duration;

use crate::config::Config;
use crate::device::AppIdentity;
use crate::ink::DEFAULT_MAX_PRESSURE;
use crate::ink::mapper::REFERENCE_DPI;

/// Explicit, per-session settings handed to the session at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub app_identity: AppIdentity,
    /// Whether a fresh pairing must be confirmed on the pad.
    pub require_confirmation: bool,
    pub connect_timeout: Duration,
    pub max_pressure: f32,
    /// Initial render surface (width, height).
    pub surface: (f32, f32),
    pub target_dpi: f32,
}

impl SessionContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_identity: config.app_identity(),
            require_confirmation: config.device.require_confirmation,
            connect_timeout: config.connect_timeout(),
            max_pressure: config.ink.max_pressure,
            surface: (config.ink.surface_width, config.ink.surface_height),
            target_dpi: config.ink.target_dpi,
        }
    }

    pub fn with_surface(mut self, width: f32, height: f32) -> Self {
        self.surface = (width, height);
        self
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            app_identity: AppIdentity::default(),
            require_confirmation: true,
            connect_timeout: Duration::from_secs(30),
            max_pressure: DEFAULT_MAX_PRESSURE,
            surface: (1024.0, 768.0),
            target_dpi: REFERENCE_DPI,
        }
    }
}
