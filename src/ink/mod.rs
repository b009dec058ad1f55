//! Real-time ink model.
//!
//! This module defines the stroke pipeline fed by a connected pad:
//! - [`RawSample`]: one event from the device's real-time channel
//! - [`StrokeAssembler`]: turns the ordered sample stream into strokes
//! - [`StrokeCollection`]: the ordered, observable stroke model
//! - [`mapper`]: device-to-render coordinate and pressure math

pub mod assembler;
pub mod mapper;
pub mod sample;
pub mod stroke;

pub use assembler::{HoverUpdate, InkNotification, PageContext, StrokeAssembler};
pub use mapper::{
    DEFAULT_MAX_PRESSURE, MICROMETER_TO_DIP, Transform, compute_transform, fit_scale,
    normalize_pressure,
};
pub use sample::{DecodedSample, HoverPhase, RawSample, SampleDecodeError, SamplePhase};
pub use stroke::{Point, Stroke, StrokeChange, StrokeCollection, StrokeId};
