//! Connection state machine for the single active device.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::connection::{
    cancel::{CancelToken, cancellable},
    transport::{DeviceLink, InkTransport},
    types::{
        ConnectError, ConnectFlags, ConnectionStatus, DeviceSignal, Generation, StatusReport,
    },
};
use crate::device::{AppIdentity, DeviceDescriptor};
use crate::runtime::events::{DeviceEventSink, EventSender};

/// Computes the status that `signal` moves a connection in state `from` to.
///
/// Returns `None` when the signal has no effect in that state. A disconnect
/// wins from every state that still has a connection.
pub fn transition(from: ConnectionStatus, signal: DeviceSignal) -> Option<ConnectionStatus> {
    use ConnectionStatus::*;

    let next = match (from, signal) {
        (Disconnected, _) => return None,
        (_, DeviceSignal::Disconnected) => Disconnected,
        (AwaitingConfirmationTap, DeviceSignal::TapConfirmed) => Idle,
        (AwaitingConfirmationTap, DeviceSignal::ConfirmationTimeout) => ConfirmationTimedOut,
        (Idle, DeviceSignal::LinkDropped) => AwaitingReconnectTap,
        (AwaitingReconnectTap, DeviceSignal::TapConfirmed) => Idle,
        (AwaitingHoldToEnterConfirmationMode, DeviceSignal::ConfirmationModeEntered) => {
            AwaitingConfirmationTap
        }
        (status, DeviceSignal::HoldButton) if status.is_connected() => {
            AwaitingHoldToEnterConfirmationMode
        }
        _ => return None,
    };

    (next != from).then_some(next)
}

/// The single live, generation-tagged session with the connected device.
pub struct ActiveConnection {
    descriptor: DeviceDescriptor,
    status: ConnectionStatus,
    generation: Generation,
    link: Box<dyn DeviceLink>,
}

impl ActiveConnection {
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn link(&self) -> &dyn DeviceLink {
        self.link.as_ref()
    }
}

impl fmt::Debug for ActiveConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveConnection")
            .field("device", &self.descriptor.id)
            .field("status", &self.status)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Parameters of one connect attempt.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub descriptor: DeviceDescriptor,
    pub app_identity: AppIdentity,
    pub require_confirmation: bool,
    pub timeout: Duration,
}

/// Owns the lifecycle of the active connection and publishes its status.
///
/// Lives on the session loop; every asynchronous status callback reaches it as
/// a queued message tagged with the generation it was issued under, and
/// messages for any other generation are dropped before they can mutate state.
pub struct ConnectionStateMachine {
    active: Option<ActiveConnection>,
    last_generation: Generation,
    events: EventSender,
    status_tx: watch::Sender<StatusReport>,
}

impl ConnectionStateMachine {
    pub(crate) fn new(events: EventSender) -> Self {
        let (status_tx, _rx) = watch::channel(StatusReport {
            status: ConnectionStatus::Disconnected,
            generation: Generation::NONE,
        });
        Self {
            active: None,
            last_generation: Generation::NONE,
            events,
            status_tx,
        }
    }

    pub fn active(&self) -> Option<&ActiveConnection> {
        self.active.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Current `(status, generation)`. Without a connection the status is
    /// `Disconnected`, or `ConfirmationTimedOut` if the last attempt ended that
    /// way, and the generation is the last one issued.
    pub fn report(&self) -> StatusReport {
        *self.status_tx.borrow()
    }

    /// Generation of the active connection, if any.
    pub fn current_generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|active| active.generation)
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.status_tx.subscribe()
    }

    /// Connects to `request.descriptor` through `transport`.
    ///
    /// A fresh generation is allocated before the transport is called and bound
    /// into the event sink it receives. On any failure, including timeout and
    /// cancellation, no connection is left behind and no status is published.
    pub async fn connect(
        &mut self,
        transport: &dyn InkTransport,
        request: ConnectRequest,
        cancel: &CancelToken,
    ) -> Result<Generation, ConnectError> {
        if let Some(active) = &self.active {
            warn!(
                "Refusing to connect to {}: {} is already connected",
                request.descriptor.id, active.descriptor.id
            );
            return Err(ConnectError::AlreadyConnected);
        }

        let generation = Generation::next();
        let sink = DeviceEventSink::new(generation, self.events.clone());
        let flags = ConnectFlags {
            require_confirmation: request.require_confirmation,
        };

        info!(
            "Connecting to {} (generation {}, confirmation={})",
            request.descriptor, generation, request.require_confirmation
        );

        let attempt = tokio::time::timeout(
            request.timeout,
            transport.connect(
                &request.descriptor,
                request.app_identity,
                flags,
                sink,
                cancel.clone(),
            ),
        );

        let connected = match cancellable(cancel, attempt).await {
            None => {
                info!("Connect to {} cancelled", request.descriptor.id);
                return Err(ConnectError::Cancelled);
            }
            Some(Err(_elapsed)) => {
                warn!(
                    "Connect to {} timed out after {:?}",
                    request.descriptor.id, request.timeout
                );
                return Err(ConnectError::Timeout);
            }
            Some(Ok(Err(err))) => {
                warn!("Connect to {} failed: {}", request.descriptor.id, err);
                return Err(err);
            }
            Some(Ok(Ok(connected))) => connected,
        };

        if cancel.is_cancelled() {
            info!(
                "Connect to {} cancelled after the link opened; releasing it",
                request.descriptor.id
            );
            return Err(ConnectError::Cancelled);
        }

        let status = if connected.awaiting_confirmation {
            ConnectionStatus::AwaitingConfirmationTap
        } else {
            ConnectionStatus::Idle
        };

        info!(
            "Connected to {} (generation {}, status {})",
            request.descriptor.id, generation, status
        );

        self.active = Some(ActiveConnection {
            descriptor: request.descriptor,
            status,
            generation,
            link: connected.link,
        });
        self.last_generation = generation;
        self.publish(status);

        Ok(generation)
    }

    /// Applies a device signal issued under `generation`.
    ///
    /// Returns the new status if the signal changed it. Signals for a stale
    /// generation, or with no effect in the current state, are ignored.
    pub fn apply(&mut self, generation: Generation, signal: DeviceSignal) -> Option<ConnectionStatus> {
        let Some(active) = self.active.as_mut() else {
            debug!(
                "Ignoring {:?} for generation {}: no active connection",
                signal, generation
            );
            return None;
        };

        if active.generation != generation {
            debug!(
                "Ignoring stale {:?} for generation {} (current {})",
                signal, generation, active.generation
            );
            return None;
        }

        let Some(next) = transition(active.status, signal) else {
            debug!("Ignoring {:?} in status {}", signal, active.status);
            return None;
        };

        if next == ConnectionStatus::Disconnected {
            info!("Device {} disconnected", active.descriptor.id);
            self.teardown();
            return Some(next);
        }

        if next == ConnectionStatus::ConfirmationTimedOut {
            info!(
                "Confirmation for {} timed out; releasing the link",
                active.descriptor.id
            );
            self.release(next);
            return Some(next);
        }

        info!("Status {} -> {} ({})", active.status, next, generation);
        active.status = next;
        self.publish(next);
        Some(next)
    }

    /// Closes the active connection unconditionally. Idempotent.
    ///
    /// Returns `true` if a connection was released.
    pub fn close(&mut self) -> bool {
        if self.active.is_none() {
            debug!("Close requested with no active connection");
            return false;
        }
        if let Some(active) = &self.active {
            info!("Closing connection to {}", active.descriptor.id);
        }
        self.teardown();
        true
    }

    fn teardown(&mut self) {
        self.release(ConnectionStatus::Disconnected);
    }

    /// Ends the attempt and publishes `status` as its final state.
    fn release(&mut self, status: ConnectionStatus) {
        // Dropping the connection drops the link capability handle.
        self.active = None;
        self.publish(status);
    }

    fn publish(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(StatusReport {
            status,
            generation: self.last_generation,
        });
    }
}
