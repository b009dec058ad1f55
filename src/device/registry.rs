//! Registry of devices currently visible to discovery.

use super::descriptor::{DeviceDescriptor, DeviceId};
use log::debug;

/// Set of candidate devices found by discovery, in the order they appeared.
///
/// The registry has no synchronization of its own: discovery callbacks are queued
/// and applied by the session loop through [`add`](Self::add) and
/// [`remove`](Self::remove) only.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor. Returns `false` (and changes nothing) if a device with
    /// the same identity is already present.
    pub fn add(&mut self, descriptor: DeviceDescriptor) -> bool {
        if self.contains(&descriptor.id) {
            debug!("Device {} already registered; ignoring", descriptor.id);
            return false;
        }
        debug!("Registered device {} ({})", descriptor.id, descriptor.name);
        self.devices.push(descriptor);
        true
    }

    /// Removes the device with the given identity, if present.
    pub fn remove(&mut self, id: &DeviceId) -> Option<DeviceDescriptor> {
        let index = self.devices.iter().position(|d| &d.id == id)?;
        debug!("Unregistered device {}", id);
        Some(self.devices.remove(index))
    }

    /// Current descriptors in insertion order. The iterator is `Clone`, so it can
    /// be restarted without touching the registry again.
    pub fn list(&self) -> std::slice::Iter<'_, DeviceDescriptor> {
        self.devices.iter()
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| &d.id == id)
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}
