//! Messages queued for the session loop and the sink handles producers use
//! to send them.

use log::debug;
use tokio::sync::mpsc;

use crate::connection::types::{DeviceSignal, Generation};
use crate::device::{DeviceDescriptor, DeviceId};
use crate::ink::sample::{HoverPhase, RawSample, SamplePhase};

pub(crate) type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Which kind of page boundary the device reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    NewPage,
    NewLayer,
}

/// One asynchronous notification waiting to be applied by the session loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    DeviceAdded(DeviceDescriptor),
    DeviceRemoved(DeviceId),
    Signal {
        generation: Generation,
        signal: DeviceSignal,
    },
    Sample {
        generation: Generation,
        sample: RawSample,
    },
    Page {
        generation: Generation,
        kind: PageKind,
    },
}

fn enqueue(tx: &EventSender, event: SessionEvent) -> bool {
    match tx.send(event) {
        Ok(()) => true,
        Err(err) => {
            debug!("Session loop gone; dropping {:?}", err.0);
            false
        }
    }
}

/// Handle given to the discovery producer.
#[derive(Debug, Clone)]
pub struct DiscoverySink {
    tx: EventSender,
}

impl DiscoverySink {
    pub(crate) fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    pub fn device_added(&self, descriptor: DeviceDescriptor) -> bool {
        enqueue(&self.tx, SessionEvent::DeviceAdded(descriptor))
    }

    pub fn device_removed(&self, id: DeviceId) -> bool {
        enqueue(&self.tx, SessionEvent::DeviceRemoved(id))
    }
}

/// Status/disconnect handle for one connection, bound to its generation.
#[derive(Debug, Clone)]
pub struct DeviceEventSink {
    generation: Generation,
    tx: EventSender,
}

impl DeviceEventSink {
    pub(crate) fn new(generation: Generation, tx: EventSender) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn signal(&self, signal: DeviceSignal) -> bool {
        enqueue(
            &self.tx,
            SessionEvent::Signal {
                generation: self.generation,
                signal,
            },
        )
    }

    pub fn disconnected(&self) -> bool {
        self.signal(DeviceSignal::Disconnected)
    }
}

/// Real-time ink feed handle for one connection, bound to its generation.
///
/// Samples must be sent in the order the device produced them.
#[derive(Debug, Clone)]
pub struct FeedSink {
    generation: Generation,
    tx: EventSender,
}

impl FeedSink {
    pub(crate) fn new(generation: Generation, tx: EventSender) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn sample(&self, sample: RawSample) -> bool {
        enqueue(
            &self.tx,
            SessionEvent::Sample {
                generation: self.generation,
                sample,
            },
        )
    }

    pub fn stroke_started(&self) -> bool {
        self.sample(RawSample::new(SamplePhase::Begin, Vec::new()))
    }

    pub fn stroke_updated(&self, channels: Vec<f32>) -> bool {
        self.sample(RawSample::new(SamplePhase::Move, channels))
    }

    pub fn stroke_ended(&self, channels: Vec<f32>) -> bool {
        self.sample(RawSample::new(SamplePhase::End, channels))
    }

    pub fn hover(&self, phase: HoverPhase, x: f32, y: f32) -> bool {
        self.sample(RawSample::new(SamplePhase::Hover(phase), vec![x, y]))
    }

    pub fn new_page(&self) -> bool {
        self.page(PageKind::NewPage)
    }

    pub fn new_layer(&self) -> bool {
        self.page(PageKind::NewLayer)
    }

    fn page(&self, kind: PageKind) -> bool {
        enqueue(
            &self.tx,
            SessionEvent::Page {
                generation: self.generation,
                kind,
            },
        )
    }
}
