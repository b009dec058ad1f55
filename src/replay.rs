//! Offline replay of recorded real-time sessions.
//!
//! A recording is a JSON file holding the device descriptor and the ordered
//! stream of feed events it produced. Replaying drives a full [`InkSession`]
//! through an in-process transport, so recordings exercise the same
//! connection and assembly path a live pad does.
//!
//! ```json
//! {
//!   "device": { "id": "pad-1", "name": "Pad", "serial_number": "SN-1",
//!               "capabilities": { "width": 21000, "height": 14800,
//!                                 "point_pitch_um": 127, "sampling_rate": 200 },
//!               "transport": "usb" },
//!   "surface": [1024, 768],
//!   "events": [
//!     { "type": "sample", "phase": "begin" },
//!     { "type": "sample", "phase": "move", "channels": [100, 200, 1.2] },
//!     { "type": "sample", "phase": "end", "channels": [110, 210, 1.1] },
//!     { "type": "new_page" }
//!   ]
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::connection::{
    CancelToken, ConnectError, ConnectFlags, ConnectedLink, DeviceLink, InkTransport,
};
use crate::context::SessionContext;
use crate::device::{
    AppIdentity, DeviceDescriptor, DeviceProperty, PropertyQueryError, PropertyValue,
};
use crate::ink::{RawSample, SamplePhase, Stroke, Transform};
use crate::runtime::{DeviceEventSink, FeedSink, InkSession};
use crate::store::EphemeralStore;

/// One recorded feed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordedEvent {
    Sample {
        phase: SamplePhase,
        #[serde(default)]
        channels: Vec<f32>,
    },
    NewPage,
    NewLayer,
}

/// A recorded session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub device: DeviceDescriptor,
    /// Render surface the recording was made against.
    #[serde(default)]
    pub surface: Option<[f32; 2]>,
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
}

/// Reads a recording from disk.
pub fn load_recording(path: &Path) -> Result<Recording> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse recording {}", path.display()))
}

/// Transport that "connects" to the recorded device and plays its events
/// back once the real-time feed starts.
pub struct ReplayTransport {
    events: Arc<[RecordedEvent]>,
}

impl ReplayTransport {
    pub fn new(events: Vec<RecordedEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

#[async_trait]
impl InkTransport for ReplayTransport {
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
        app_identity: AppIdentity,
        _flags: ConnectFlags,
        _events: DeviceEventSink,
        _cancel: CancelToken,
    ) -> Result<ConnectedLink, ConnectError> {
        debug!("Replay connect to {} as {}", descriptor.id, app_identity);
        Ok(ConnectedLink {
            link: Box::new(ReplayLink {
                descriptor: descriptor.clone(),
                events: Arc::clone(&self.events),
                started: AtomicBool::new(false),
            }),
            awaiting_confirmation: false,
        })
    }
}

/// Link answering property queries from the recorded descriptor.
struct ReplayLink {
    descriptor: DeviceDescriptor,
    events: Arc<[RecordedEvent]>,
    started: AtomicBool,
}

#[async_trait]
impl DeviceLink for ReplayLink {
    async fn get_property(
        &self,
        property: DeviceProperty,
        _cancel: &CancelToken,
    ) -> Result<PropertyValue, PropertyQueryError> {
        let caps = &self.descriptor.capabilities;
        Ok(match property {
            DeviceProperty::DeviceName => PropertyValue::Text(self.descriptor.name.clone()),
            DeviceProperty::SerialNumber => {
                PropertyValue::Text(self.descriptor.serial_number.clone())
            }
            DeviceProperty::Width => PropertyValue::Unsigned(caps.width),
            DeviceProperty::Height => PropertyValue::Unsigned(caps.height),
            DeviceProperty::PointSize => PropertyValue::Unsigned(caps.point_pitch_um),
            DeviceProperty::SamplingRate => PropertyValue::Unsigned(caps.sampling_rate),
            DeviceProperty::BatteryLevel => {
                return Err(PropertyQueryError::Unsupported(property.label()));
            }
        })
    }

    async fn start_realtime(
        &self,
        feed: FeedSink,
        _cancel: &CancelToken,
    ) -> Result<(), PropertyQueryError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for event in self.events.iter() {
            let queued = match event {
                RecordedEvent::Sample { phase, channels } => {
                    feed.sample(RawSample::new(*phase, channels.clone()))
                }
                RecordedEvent::NewPage => feed.new_page(),
                RecordedEvent::NewLayer => feed.new_layer(),
            };
            if !queued {
                return Err(PropertyQueryError::LinkLost);
            }
        }
        Ok(())
    }

    async fn stop_realtime(&self, _cancel: &CancelToken) -> Result<(), PropertyQueryError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_realtime_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub device: String,
    pub events: usize,
    pub stroke_count: usize,
    pub point_count: usize,
    pub open_strokes: usize,
    pub pages: u64,
    pub scale: f32,
    pub page_transform: Option<Transform>,
    pub strokes: Vec<Stroke>,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device:  {}", self.device)?;
        writeln!(f, "Events:  {}", self.events)?;
        writeln!(
            f,
            "Strokes: {} ({} points, {} open)",
            self.stroke_count, self.point_count, self.open_strokes
        )?;
        writeln!(f, "Pages:   {}", self.pages)?;
        write!(f, "Scale:   {:.4}", self.scale)?;
        if let Some(transform) = &self.page_transform {
            write!(
                f,
                "\nPage:    scale {:.4}, translate ({:.1}, {:.1})",
                transform.scale, transform.translate_x, transform.translate_y
            )?;
        }
        Ok(())
    }
}

/// Plays `recording` through a fresh session and summarizes the strokes.
pub async fn replay(recording: Recording, mut context: SessionContext) -> Result<ReplaySummary> {
    if let Some([width, height]) = recording.surface {
        context = context.with_surface(width, height);
    }
    context.require_confirmation = false;

    let descriptor = recording.device.clone();
    let event_count = recording.events.len();
    let transport = Arc::new(ReplayTransport::new(recording.events));
    let mut session = InkSession::new(context, transport, Arc::new(EphemeralStore::new()));
    let cancel = CancelToken::new();

    session.discovery_sink().device_added(descriptor.clone());
    session.pump();

    session
        .connect_device(&descriptor.id, &cancel)
        .await
        .context("Replay connect failed")?;
    session
        .start_ink(&cancel)
        .await
        .context("Replay setup failed")?;
    let applied = session.pump();
    debug!("Applied {applied} replayed event(s)");

    let summary = summarize(&session, &descriptor, event_count);
    session.close();
    info!(
        "Replayed {} event(s) into {} stroke(s)",
        summary.events, summary.stroke_count
    );
    Ok(summary)
}

fn summarize(session: &InkSession, descriptor: &DeviceDescriptor, events: usize) -> ReplaySummary {
    let strokes = session.strokes();
    ReplaySummary {
        device: descriptor.to_string(),
        events,
        stroke_count: strokes.len(),
        point_count: strokes.point_count(),
        open_strokes: strokes.iter().filter(|s| !s.is_closed()).count(),
        pages: session.assembler().page().value(),
        scale: session.assembler().scale(),
        page_transform: session.page_transform(),
        strokes: strokes.iter().cloned().collect(),
    }
}
