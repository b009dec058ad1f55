//! Remembered-device persistence.
//!
//! Keeps the descriptor of the last successfully connected pad so the next
//! session can reconnect without discovery. The file is written atomically
//! under an advisory lock; every failure is logged and treated as "no device
//! configured".

mod options;
mod record;
mod storage;

pub use options::{DEFAULT_MAX_FILE_SIZE_BYTES, StoreOptions, options_from_config};
pub use record::{SavedDevice, load_device, save_device};
pub use storage::{ClearOutcome, DeviceInspection, clear_device, inspect_device};

use crate::device::DeviceDescriptor;
use log::warn;
use std::sync::Mutex;

/// Where the session remembers its last device.
///
/// Implementations never fail: errors are logged and swallowed.
pub trait DeviceStore: Send + Sync {
    fn save(&self, descriptor: &DeviceDescriptor);
    fn load(&self) -> Option<DeviceDescriptor>;
    fn forget(&self);
}

/// [`DeviceStore`] backed by `last-device.json`.
#[derive(Debug, Clone)]
pub struct FileDeviceStore {
    options: StoreOptions,
}

impl FileDeviceStore {
    pub fn new(options: StoreOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

impl DeviceStore for FileDeviceStore {
    fn save(&self, descriptor: &DeviceDescriptor) {
        if let Err(err) = save_device(descriptor, &self.options) {
            warn!("Failed to remember device {}: {:#}", descriptor.id, err);
        }
    }

    fn load(&self) -> Option<DeviceDescriptor> {
        match load_device(&self.options) {
            Ok(saved) => saved.map(|saved| saved.descriptor),
            Err(err) => {
                warn!("Ignoring unreadable device file: {:#}", err);
                None
            }
        }
    }

    fn forget(&self) {
        if let Err(err) = clear_device(&self.options) {
            warn!("Failed to forget device: {:#}", err);
        }
    }
}

/// In-memory [`DeviceStore`] that lives as long as the process.
#[derive(Debug, Default)]
pub struct EphemeralStore {
    device: Mutex<Option<DeviceDescriptor>>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for EphemeralStore {
    fn save(&self, descriptor: &DeviceDescriptor) {
        if let Ok(mut device) = self.device.lock() {
            *device = Some(descriptor.clone());
        }
    }

    fn load(&self) -> Option<DeviceDescriptor> {
        self.device.lock().ok().and_then(|device| device.clone())
    }

    fn forget(&self) {
        if let Ok(mut device) = self.device.lock() {
            *device = None;
        }
    }
}
