use super::options::StoreOptions;
use super::record::{self, SavedDevice};
use anyhow::{Context, Result};
use fs2::FileExt;
use log::warn;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Result of clearing the remembered device.
#[derive(Debug, Clone, Copy)]
pub struct ClearOutcome {
    pub removed_device: bool,
    pub removed_lock: bool,
}

/// Summary information about the device file for CLI reporting.
#[derive(Debug, Clone)]
pub struct DeviceInspection {
    pub device_path: PathBuf,
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub modified: Option<SystemTime>,
    /// `None` when the file is absent or unreadable.
    pub saved: Option<SavedDevice>,
}

/// Remove the remembered device file and its lock.
pub fn clear_device(options: &StoreOptions) -> Result<ClearOutcome> {
    let removed_device = remove_file_if_exists(&options.device_file_path())?;
    let removed_lock = remove_file_if_exists(&options.lock_file_path())?;

    Ok(ClearOutcome {
        removed_device,
        removed_lock,
    })
}

/// Inspect the device file without failing on unreadable contents.
pub fn inspect_device(options: &StoreOptions) -> Result<DeviceInspection> {
    let device_path = options.device_file_path();
    let metadata = fs::metadata(&device_path).ok();

    let exists = metadata.is_some();
    let size_bytes = metadata.as_ref().map(|m| m.len());
    let modified = metadata.as_ref().and_then(|m| m.modified().ok());

    let mut saved = None;
    if exists {
        let lock_path = options.lock_file_path();
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
        lock_file
            .lock_shared()
            .with_context(|| format!("failed to acquire shared lock {}", lock_path.display()))?;

        let loaded = record::load_device_inner(&device_path);

        FileExt::unlock(&lock_file).unwrap_or_else(|err| {
            warn!("failed to unlock {}: {}", lock_path.display(), err)
        });

        match loaded {
            Ok(device) => saved = device,
            Err(err) => warn!("Device file {} is unreadable: {:#}", device_path.display(), err),
        }
    }

    Ok(DeviceInspection {
        device_path,
        exists,
        size_bytes,
        modified,
        saved,
    })
}

fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        Ok(true)
    } else {
        Ok(false)
    }
}
