//! Data types for the connection lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Status of the active connection as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// Connected and usable
    Idle,
    /// Waiting for the user to tap the central button to confirm pairing
    AwaitingConfirmationTap,
    /// Link dropped; waiting for a tap to restore it
    AwaitingReconnectTap,
    /// Waiting for the user to hold the central button to enter confirmation mode
    AwaitingHoldToEnterConfirmationMode,
    /// Confirmation period expired; the caller must discover and connect again
    ConfirmationTimedOut,
    /// No active connection
    Disconnected,
}

impl ConnectionStatus {
    /// Whether the device is still attached and may receive further signals
    /// other than a disconnect.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Idle
                | ConnectionStatus::AwaitingConfirmationTap
                | ConnectionStatus::AwaitingReconnectTap
                | ConnectionStatus::AwaitingHoldToEnterConfirmationMode
        )
    }

    /// User-facing prompt for this status. Empty when nothing needs saying.
    pub fn message(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "",
            ConnectionStatus::AwaitingConfirmationTap => {
                "Tap the Central Button to confirm the connection."
            }
            ConnectionStatus::AwaitingReconnectTap => {
                "Tap the Central Button to restore the connection."
            }
            ConnectionStatus::AwaitingHoldToEnterConfirmationMode => {
                "Press and hold the Central Button to enter user confirmation mode."
            }
            ConnectionStatus::ConfirmationTimedOut => "The connection confirmation period expired.",
            ConnectionStatus::Disconnected => "The device was disconnected.",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::AwaitingConfirmationTap => "awaiting-confirmation-tap",
            ConnectionStatus::AwaitingReconnectTap => "awaiting-reconnect-tap",
            ConnectionStatus::AwaitingHoldToEnterConfirmationMode => "awaiting-hold",
            ConnectionStatus::ConfirmationTimedOut => "confirmation-timed-out",
            ConnectionStatus::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Tag identifying one connection session.
///
/// Generations are unique and strictly increasing for the lifetime of the
/// process; callbacks carry the generation they were issued under so late
/// deliveries from an older session can be recognised and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

impl Generation {
    /// Placeholder reported before the first connection.
    pub const NONE: Generation = Generation(0);

    pub(crate) fn next() -> Self {
        Generation(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events raised by the device about its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSignal {
    /// The user tapped the central button
    TapConfirmed,
    /// The confirmation window elapsed without a tap
    ConfirmationTimeout,
    /// The link dropped but can be restored by a tap
    LinkDropped,
    /// The device asks for the button to be held
    HoldButton,
    /// The hold completed and the device entered confirmation mode
    ConfirmationModeEntered,
    /// The device went away
    Disconnected,
}

/// `(status, generation)` pair published to status observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub generation: Generation,
}

/// Options passed to the transport when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectFlags {
    /// Ask the device to require a button tap before the connection is usable.
    pub require_confirmation: bool,
}

/// Errors that can occur while connecting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("device rejected the connection: {0}")]
    Rejected(String),

    #[error("connection attempt timed out")]
    Timeout,

    #[error("a device is already connected")]
    AlreadyConnected,

    #[error("connection attempt cancelled")]
    Cancelled,
}
