//! Descriptor types for discovered devices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity assigned by the discovery layer.
///
/// Two descriptors with the same id refer to the same physical device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link the device was discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Usb,
    Ble,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Usb => f.write_str("USB"),
            TransportKind::Ble => f.write_str("BLE"),
        }
    }
}

/// Physical capabilities reported at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Sensor width in device units
    pub width: u32,
    /// Sensor height in device units
    pub height: u32,
    /// Size of one device unit in micrometers
    pub point_pitch_um: u32,
    /// Samples per second
    pub sampling_rate: u32,
}

/// Static identity and capability record for a discoverable pad.
///
/// Owned by the [`DeviceRegistry`](super::DeviceRegistry) while unconnected and
/// handed by value to the connection state machine on connect. This is also the
/// form persisted to remember the last paired device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub name: String,
    pub serial_number: String,
    pub capabilities: DeviceCapabilities,
    pub transport: TransportKind,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] via {}", self.name, self.serial_number, self.transport)
    }
}

#[cfg(test)]
pub(crate) fn test_descriptor(id: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        id: DeviceId::new(id),
        name: format!("Pad {id}"),
        serial_number: format!("SN-{id}"),
        capabilities: DeviceCapabilities {
            width: 21000,
            height: 14800,
            point_pitch_um: 127,
            sampling_rate: 200,
        },
        transport: TransportKind::Usb,
    }
}
