//! Boundary traits implemented by USB/BLE backends.
//!
//! Backends never touch session state directly. Everything they report goes
//! through the sink handles they are given, which tag each event with the
//! generation of the connection it belongs to.

use async_trait::async_trait;

use crate::connection::{
    cancel::CancelToken,
    types::{ConnectError, ConnectFlags},
};
use crate::device::{
    AppIdentity, DeviceDescriptor,
    properties::{DeviceProperty, PropertyQueryError, PropertyValue},
};
use crate::runtime::events::{DeviceEventSink, FeedSink};

/// Result of a successful transport connect.
pub struct ConnectedLink {
    pub link: Box<dyn DeviceLink>,
    /// The device wants a button tap before the connection is usable.
    pub awaiting_confirmation: bool,
}

/// Opens connections to discovered devices.
#[async_trait]
pub trait InkTransport: Send + Sync {
    /// Connects to `descriptor`. Status changes and the disconnect signal for
    /// this connection must be reported through `events` only.
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
        app_identity: AppIdentity,
        flags: ConnectFlags,
        events: DeviceEventSink,
        cancel: CancelToken,
    ) -> Result<ConnectedLink, ConnectError>;
}

/// Capability handle for one live connection. Dropping it releases the link.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    async fn get_property(
        &self,
        property: DeviceProperty,
        cancel: &CancelToken,
    ) -> Result<PropertyValue, PropertyQueryError>;

    /// Starts the real-time ink feed, delivering samples through `feed`.
    async fn start_realtime(
        &self,
        feed: FeedSink,
        cancel: &CancelToken,
    ) -> Result<(), PropertyQueryError>;

    async fn stop_realtime(&self, cancel: &CancelToken) -> Result<(), PropertyQueryError>;

    fn is_realtime_started(&self) -> bool;
}
