//! Configuration enum types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the remembered device file is stored.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// Platform data directory (`~/.local/share/inklink`)
    #[default]
    Auto,
    /// Next to the config file (`~/.config/inklink`)
    Config,
    /// `storage.custom_directory`
    Custom,
}
