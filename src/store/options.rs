use crate::config::{StorageConfig, StorageMode};
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Files larger than this are never loaded.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 64 * 1024;

const DEVICE_FILE_STEM: &str = "last-device";

/// Runtime options derived from configuration for the remembered-device file.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub base_dir: PathBuf,
    pub max_file_size_bytes: u64,
}

impl StoreOptions {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }

    pub fn device_file_path(&self) -> PathBuf {
        self.base_dir.join(format!("{DEVICE_FILE_STEM}.json"))
    }

    pub fn lock_file_path(&self) -> PathBuf {
        self.base_dir.join(format!("{DEVICE_FILE_STEM}.lock"))
    }
}

/// Build store options from configuration values.
pub fn options_from_config(storage_cfg: &StorageConfig, config_dir: &Path) -> Result<StoreOptions> {
    let base_dir = match storage_cfg.mode {
        StorageMode::Auto => {
            let root = dirs::data_dir().unwrap_or_else(|| config_dir.to_path_buf());
            root.join("inklink")
        }
        StorageMode::Config => config_dir.to_path_buf(),
        StorageMode::Custom => {
            let raw = storage_cfg.custom_directory.as_ref().ok_or_else(|| {
                anyhow!("storage.custom_directory must be set when mode = \"custom\"")
            })?;
            let expanded = expand_tilde(raw);
            if expanded.as_os_str().is_empty() {
                return Err(anyhow!("storage.custom_directory resolved to an empty path"));
            }
            expanded
        }
    };

    Ok(StoreOptions::new(base_dir))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
