//! Device identity, discovery bookkeeping and property queries.
//!
//! - [`DeviceDescriptor`]: immutable identity/capability record of a discovered pad
//! - [`DeviceRegistry`]: the set of currently visible candidates
//! - [`DeviceProperty`]: the properties a connected pad can be asked for

pub mod descriptor;
pub mod identity;
pub mod properties;
pub mod registry;

pub use descriptor::{DeviceCapabilities, DeviceDescriptor, DeviceId, TransportKind};
pub use identity::AppIdentity;
pub use properties::{
    DeviceProperties, DeviceProperty, InkExtents, PropertyQueryError, PropertyValue,
};
pub use registry::DeviceRegistry;
