//! The session loop.
//!
//! [`InkSession`] owns the device registry, the connection state machine and
//! the stroke assembler. Producers (discovery, the transport's status and
//! disconnect callbacks, the real-time feed) never touch that state; they
//! enqueue [`SessionEvent`]s through their sink handles and the session
//! applies them one at a time, in arrival order.

pub mod events;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

use crate::connection::{
    ActiveConnection, CancelToken, ConnectError, ConnectRequest, ConnectionStateMachine,
    ConnectionStatus, Generation, InkTransport, StatusReport, cancellable,
};
use crate::context::SessionContext;
use crate::device::{
    DeviceDescriptor, DeviceId, DeviceProperties, DeviceRegistry, InkExtents, PropertyQueryError,
};
use crate::ink::{InkNotification, StrokeAssembler, StrokeCollection, Transform};
use crate::store::DeviceStore;

pub use events::{DeviceEventSink, DiscoverySink, FeedSink, PageKind, SessionEvent};

/// Buffered ink notifications per subscriber before old ones are dropped.
const INK_CHANNEL_CAPACITY: usize = 1024;

/// Errors setting up or tearing down the real-time feed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("no device is connected")]
    NotConnected,

    #[error("device setup failed: {0}")]
    Property(#[from] PropertyQueryError),

    #[error("device setup cancelled")]
    Cancelled,
}

/// Single-consumer session over one pad at a time.
pub struct InkSession {
    context: SessionContext,
    transport: Arc<dyn InkTransport>,
    store: Arc<dyn DeviceStore>,
    registry: DeviceRegistry,
    machine: ConnectionStateMachine,
    assembler: StrokeAssembler,
    extents: Option<InkExtents>,
    /// Generation whose real-time samples are accepted.
    feed: Option<Generation>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    ink_tx: broadcast::Sender<InkNotification>,
}

impl InkSession {
    pub fn new(
        context: SessionContext,
        transport: Arc<dyn InkTransport>,
        store: Arc<dyn DeviceStore>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ink_tx, _) = broadcast::channel(INK_CHANNEL_CAPACITY);
        let machine = ConnectionStateMachine::new(events_tx.clone());
        let mut assembler = StrokeAssembler::new(context.max_pressure);
        assembler.resize(context.surface.0, context.surface.1);

        Self {
            context,
            transport,
            store,
            registry: DeviceRegistry::new(),
            machine,
            assembler,
            extents: None,
            feed: None,
            events_tx,
            events_rx,
            ink_tx,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Handle for the discovery producer.
    pub fn discovery_sink(&self) -> DiscoverySink {
        DiscoverySink::new(self.events_tx.clone())
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn status(&self) -> StatusReport {
        self.machine.report()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusReport> {
        self.machine.subscribe()
    }

    pub fn active(&self) -> Option<&ActiveConnection> {
        self.machine.active()
    }

    pub fn strokes(&self) -> &StrokeCollection {
        self.assembler.strokes()
    }

    pub fn assembler(&self) -> &StrokeAssembler {
        &self.assembler
    }

    pub fn subscribe_ink(&self) -> broadcast::Receiver<InkNotification> {
        self.ink_tx.subscribe()
    }

    /// Whether the real-time feed of the current connection is attached.
    pub fn is_inking(&self) -> bool {
        self.feed.is_some()
    }

    /// Page transform of the connected sensor, once the feed is set up.
    pub fn page_transform(&self) -> Option<Transform> {
        self.extents
            .map(|extents| extents.page_transform(self.context.target_dpi))
    }

    /// Connects to a device picked from the registry.
    ///
    /// Uses the configured confirmation policy and remembers the device on
    /// success.
    pub async fn connect_device(
        &mut self,
        id: &DeviceId,
        cancel: &CancelToken,
    ) -> Result<Generation, ConnectError> {
        let Some(descriptor) = self.registry.get(id).cloned() else {
            warn!("Device {id} is not in the registry");
            return Err(ConnectError::Unreachable(format!("device {id} is not available")));
        };
        let require_confirmation = self.context.require_confirmation;
        let generation = self
            .connect_descriptor(descriptor.clone(), require_confirmation, cancel)
            .await?;
        self.store.save(&descriptor);
        Ok(generation)
    }

    /// Reconnects to the remembered device without asking for confirmation.
    ///
    /// Returns `Ok(None)` when no device is remembered.
    pub async fn reconnect_saved(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<Option<Generation>, ConnectError> {
        let Some(descriptor) = self.store.load() else {
            info!("No remembered device; discovery required");
            return Ok(None);
        };
        info!("Reconnecting to remembered device {descriptor}");
        self.connect_descriptor(descriptor, false, cancel)
            .await
            .map(Some)
    }

    async fn connect_descriptor(
        &mut self,
        descriptor: DeviceDescriptor,
        require_confirmation: bool,
        cancel: &CancelToken,
    ) -> Result<Generation, ConnectError> {
        let request = ConnectRequest {
            descriptor,
            app_identity: self.context.app_identity,
            require_confirmation,
            timeout: self.context.connect_timeout,
        };
        self.machine
            .connect(self.transport.as_ref(), request, cancel)
            .await
    }

    /// Reads the full property listing of the connected device.
    pub async fn query_properties(
        &self,
        cancel: &CancelToken,
    ) -> Result<DeviceProperties, SetupError> {
        let active = self.machine.active().ok_or(SetupError::NotConnected)?;
        DeviceProperties::query(active.link(), cancel)
            .await
            .map_err(setup_error)
    }

    /// Queries the sensor extents and attaches the real-time feed.
    ///
    /// The assembler and feed are only updated once every step succeeded; a
    /// failed or cancelled setup leaves the session as it was.
    pub async fn start_ink(&mut self, cancel: &CancelToken) -> Result<InkExtents, SetupError> {
        let active = self.machine.active().ok_or(SetupError::NotConnected)?;
        let generation = active.generation();
        let link = active.link();

        let extents = InkExtents::query(link, cancel).await.map_err(setup_error)?;

        let feed = FeedSink::new(generation, self.events_tx.clone());
        match cancellable(cancel, link.start_realtime(feed, cancel)).await {
            None => return Err(SetupError::Cancelled),
            Some(result) => result.map_err(setup_error)?,
        }

        info!(
            "Real-time ink started for generation {generation}: {}x{} @ {} µm",
            extents.width, extents.height, extents.point_pitch_um
        );
        self.assembler
            .set_device_extents(extents.width as f32, extents.height as f32);
        self.extents = Some(extents);
        self.feed = Some(generation);
        Ok(extents)
    }

    /// Detaches the real-time feed of the current connection.
    pub async fn stop_ink(&mut self, cancel: &CancelToken) -> Result<(), SetupError> {
        let active = self.machine.active().ok_or(SetupError::NotConnected)?;
        if self.feed.is_none() {
            debug!("Real-time ink not started; nothing to stop");
            return Ok(());
        }
        match cancellable(cancel, active.link().stop_realtime(cancel)).await {
            None => return Err(SetupError::Cancelled),
            Some(result) => result.map_err(setup_error)?,
        }
        info!("Real-time ink stopped");
        self.feed = None;
        Ok(())
    }

    /// Closes the active connection, if any. Idempotent.
    pub fn close(&mut self) -> bool {
        self.detach_feed();
        self.machine.close()
    }

    /// Forgets the remembered device.
    pub fn forget_device(&self) {
        self.store.forget();
    }

    /// Refits the ink scale to a resized render surface.
    pub fn resize_surface(&mut self, width: f32, height: f32) {
        self.context.surface = (width, height);
        self.assembler.resize(width, height);
    }

    /// Applies one queued event.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::DeviceAdded(descriptor) => {
                let id = descriptor.id.clone();
                if self.registry.add(descriptor) {
                    info!("Discovered device {id}");
                }
            }
            SessionEvent::DeviceRemoved(id) => {
                if self.registry.remove(&id).is_some() {
                    info!("Device {id} went away");
                }
            }
            SessionEvent::Signal { generation, signal } => {
                match self.machine.apply(generation, signal) {
                    Some(ConnectionStatus::Disconnected) => {
                        self.detach_feed();
                        info!(
                            "Connection lost; {} device(s) still visible",
                            self.registry.len()
                        );
                    }
                    Some(ConnectionStatus::ConfirmationTimedOut) => {
                        self.detach_feed();
                        info!("Pairing not confirmed in time; connect again to retry");
                    }
                    _ => {}
                }
            }
            SessionEvent::Sample { generation, sample } => {
                if !self.accepts_feed(generation) {
                    return;
                }
                let notifications = self.assembler.apply(&sample);
                self.broadcast(notifications);
            }
            SessionEvent::Page { generation, kind } => {
                if !self.accepts_feed(generation) {
                    return;
                }
                let notifications = match kind {
                    PageKind::NewPage => self.assembler.new_page(),
                    PageKind::NewLayer => self.assembler.new_layer(),
                };
                debug!("{kind:?}: page {}", self.assembler.page().value());
                self.broadcast(notifications);
            }
        }
    }

    /// Applies every event already queued without waiting. Returns how many
    /// were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Waits for the next event and applies it.
    pub async fn next_event(&mut self) {
        // The session holds a sender, so the queue never closes.
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Applies events as they arrive until `cancel` fires.
    pub async fn run_until_cancelled(&mut self, cancel: &CancelToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Session loop cancelled");
                    break;
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }
    }

    fn accepts_feed(&self, generation: Generation) -> bool {
        if self.feed == Some(generation) {
            true
        } else {
            debug!(
                "Dropping feed event for generation {generation} (feed {:?})",
                self.feed
            );
            false
        }
    }

    fn detach_feed(&mut self) {
        self.feed = None;
        self.extents = None;
    }

    fn broadcast(&self, notifications: Vec<InkNotification>) {
        for notification in notifications {
            // No subscribers is fine.
            let _ = self.ink_tx.send(notification);
        }
    }
}

fn setup_error(err: PropertyQueryError) -> SetupError {
    match err {
        PropertyQueryError::Cancelled => SetupError::Cancelled,
        other => {
            warn!("Device setup failed: {other}");
            SetupError::Property(other)
        }
    }
}
