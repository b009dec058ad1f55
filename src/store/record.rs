use super::options::StoreOptions;
use crate::device::DeviceDescriptor;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DeviceFile {
    version: u32,
    saved_at: String,
    device: DeviceDescriptor,
}

/// A remembered device as read back from disk.
#[derive(Debug, Clone)]
pub struct SavedDevice {
    pub descriptor: DeviceDescriptor,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Persist the descriptor of the last successfully connected device.
pub fn save_device(descriptor: &DeviceDescriptor, options: &StoreOptions) -> Result<()> {
    fs::create_dir_all(&options.base_dir).with_context(|| {
        format!(
            "failed to create storage directory {}",
            options.base_dir.display()
        )
    })?;

    let lock_file = open_lock(options)?;
    lock_file
        .lock_exclusive()
        .with_context(|| format!("failed to lock {}", options.lock_file_path().display()))?;

    let result = save_device_inner(descriptor, options);

    release(&lock_file, options);
    result
}

fn save_device_inner(descriptor: &DeviceDescriptor, options: &StoreOptions) -> Result<()> {
    let device_path = options.device_file_path();
    let payload = DeviceFile {
        version: CURRENT_VERSION,
        saved_at: Utc::now().to_rfc3339(),
        device: descriptor.clone(),
    };

    let json_bytes =
        serde_json::to_vec_pretty(&payload).context("failed to serialise device record")?;

    let tmp_path = temp_path(&device_path);
    if let Err(err) = write_and_replace(&tmp_path, &device_path, &json_bytes) {
        if tmp_path.exists() {
            if let Err(remove_err) = fs::remove_file(&tmp_path) {
                warn!(
                    "Failed to remove temporary file {}: {}",
                    tmp_path.display(),
                    remove_err
                );
            }
        }
        return Err(err);
    }

    info!(
        "Remembered device {} in {}",
        descriptor.id,
        device_path.display()
    );
    Ok(())
}

fn write_and_replace(tmp_path: &Path, device_path: &Path, bytes: &[u8]) -> Result<()> {
    {
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(tmp_path)
            .with_context(|| format!("failed to open temporary file {}", tmp_path.display()))?;
        tmp_file
            .write_all(bytes)
            .context("failed to write device record")?;
        tmp_file
            .sync_all()
            .context("failed to sync temporary device file")?;
    }

    fs::rename(tmp_path, device_path).with_context(|| {
        format!(
            "failed to move temporary file {} -> {}",
            tmp_path.display(),
            device_path.display()
        )
    })
}

/// Load the remembered device, if any.
///
/// A missing file is `Ok(None)`; an oversized file or one written by a newer
/// version is skipped with a warning.
pub fn load_device(options: &StoreOptions) -> Result<Option<SavedDevice>> {
    let device_path = options.device_file_path();
    if !device_path.exists() {
        debug!(
            "No device file present at {}, skipping load",
            device_path.display()
        );
        return Ok(None);
    }

    let metadata = fs::metadata(&device_path)
        .with_context(|| format!("failed to stat device file {}", device_path.display()))?;
    if metadata.len() > options.max_file_size_bytes {
        warn!(
            "Device file {} is {} bytes which exceeds the limit ({} bytes); refusing to load",
            device_path.display(),
            metadata.len(),
            options.max_file_size_bytes
        );
        return Ok(None);
    }

    let lock_file = open_lock(options)?;
    lock_file
        .lock_shared()
        .with_context(|| format!("failed to acquire shared lock {}", options.lock_file_path().display()))?;

    let result = load_device_inner(&device_path);

    release(&lock_file, options);
    result
}

pub(crate) fn load_device_inner(device_path: &Path) -> Result<Option<SavedDevice>> {
    let bytes = fs::read(device_path)
        .with_context(|| format!("failed to read device file {}", device_path.display()))?;

    let file: DeviceFile =
        serde_json::from_slice(&bytes).context("failed to parse device json")?;

    if file.version > CURRENT_VERSION {
        warn!(
            "Device file {} has version {} (this build reads up to {}); ignoring",
            device_path.display(),
            file.version,
            CURRENT_VERSION
        );
        return Ok(None);
    }

    let saved_at = DateTime::parse_from_rfc3339(&file.saved_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| debug!("Unreadable saved_at '{}': {}", file.saved_at, err))
        .ok();

    Ok(Some(SavedDevice {
        descriptor: file.device,
        saved_at,
    }))
}

fn open_lock(options: &StoreOptions) -> Result<File> {
    let lock_path = options.lock_file_path();
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("failed to open lock file {}", lock_path.display()))
}

fn release(lock_file: &File, options: &StoreOptions) {
    FileExt::unlock(lock_file).unwrap_or_else(|err| {
        warn!(
            "failed to unlock {}: {}",
            options.lock_file_path().display(),
            err
        )
    });
}

fn temp_path(target: &Path) -> PathBuf {
    let mut candidate = target.with_extension("json.tmp");
    let mut counter = 0u32;
    while candidate.exists() {
        counter += 1;
        candidate = target.with_extension(format!("json.tmp{counter}"));
    }
    candidate
}
