//! Raw samples from the device's real-time channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of a hover (pen in range, not touching) sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverPhase {
    Begin,
    Move,
    End,
}

/// Phase of a sample within the stroke stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePhase {
    /// Pen touched down; the data arrives with the following samples
    Begin,
    /// Pen moved while touching
    Move,
    /// Pen lifted; carries the final point
    End,
    /// Pen moved while hovering
    Hover(HoverPhase),
}

/// One event from the real-time feed.
///
/// Data channels are stored `x, y, pressure` as produced by the device. The
/// pressure channel uses the firmware's raw range, not `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub phase: SamplePhase,
    #[serde(default)]
    pub channels: Vec<f32>,
}

/// Channel values extracted from a well-formed sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSample {
    pub x: f32,
    pub y: f32,
    /// Raw pressure channel; absent for hover samples that do not carry it.
    pub pressure: Option<f32>,
}

/// Errors decoding a sample. Never fatal: the sample is dropped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleDecodeError {
    #[error("malformed {phase:?} sample: {found} channel(s), {required} required")]
    Malformed {
        phase: SamplePhase,
        found: usize,
        required: usize,
    },

    #[error("non-finite channel value in {phase:?} sample")]
    NonFinite { phase: SamplePhase },
}

impl RawSample {
    pub fn new(phase: SamplePhase, channels: Vec<f32>) -> Self {
        Self { phase, channels }
    }

    /// Data sample with `x, y, pressure` channels.
    pub fn point(phase: SamplePhase, x: f32, y: f32, pressure: f32) -> Self {
        Self::new(phase, vec![x, y, pressure])
    }

    /// Channels this phase needs to be usable.
    pub fn required_channels(&self) -> usize {
        match self.phase {
            SamplePhase::Begin => 0,
            SamplePhase::Move | SamplePhase::End => 3,
            SamplePhase::Hover(_) => 2,
        }
    }

    /// Extracts `x, y, pressure`. Samples with too few channels, or with
    /// non-finite values in the channels used, are rejected.
    pub fn decode(&self) -> Result<DecodedSample, SampleDecodeError> {
        let required = self.required_channels().max(2);
        if self.channels.len() < required {
            return Err(SampleDecodeError::Malformed {
                phase: self.phase,
                found: self.channels.len(),
                required,
            });
        }

        let x = self.channels[0];
        let y = self.channels[1];
        let pressure = self.channels.get(2).copied();
        if !x.is_finite() || !y.is_finite() || pressure.is_some_and(|p| !p.is_finite()) {
            return Err(SampleDecodeError::NonFinite { phase: self.phase });
        }

        Ok(DecodedSample { x, y, pressure })
    }
}
