//! Device connection lifecycle.
//!
//! This module owns the single active connection to a pad: the connect
//! contract, the status state machine driven by device signals, generation
//! tagging of asynchronous callbacks, and the transport boundary traits
//! implemented by USB/BLE backends.

pub mod cancel;
pub mod machine;
pub mod transport;
pub mod types;

pub use cancel::{CancelToken, cancellable};
pub use machine::{ActiveConnection, ConnectRequest, ConnectionStateMachine, transition};
pub use transport::{ConnectedLink, DeviceLink, InkTransport};
pub use types::{
    ConnectError, ConnectFlags, ConnectionStatus, DeviceSignal, Generation, StatusReport,
};
