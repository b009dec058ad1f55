//! Coordinate and pressure transforms from device space to render space.

use serde::Serialize;

/// Logical units per micrometer (96 logical units per inch of 25400 µm).
pub const MICROMETER_TO_DIP: f32 = 96.0 / 25400.0;

/// Logical units per inch of the default render space.
pub const REFERENCE_DPI: f32 = 96.0;

/// Ceiling of the pad's pressure channel.
pub const DEFAULT_MAX_PRESSURE: f32 = 1.402218;

const MICROMETERS_PER_INCH: f32 = 25400.0;

/// Uniform scale followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Maps a device point: scale first, then translate.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale + self.translate_x,
            y * self.scale + self.translate_y,
        )
    }
}

/// Page transform for a sensor of `width` x `height` units of
/// `point_pitch_um` micrometers each, rendered at 96 DPI.
///
/// The sensor's native origin is a quarter turn away from the render space, so
/// the translation uses the sensor *height* along X: the page lands to the
/// right of the origin by its rotated width.
pub fn compute_transform(width: u32, height: u32, point_pitch_um: u32) -> Transform {
    compute_transform_at_dpi(width, height, point_pitch_um, REFERENCE_DPI)
}

/// [`compute_transform`] for an arbitrary target DPI.
pub fn compute_transform_at_dpi(
    _width: u32,
    height: u32,
    point_pitch_um: u32,
    target_dpi: f32,
) -> Transform {
    let scale = point_pitch_um as f32 * (target_dpi / MICROMETERS_PER_INCH);
    Transform {
        scale,
        translate_x: height as f32 * scale,
        translate_y: 0.0,
    }
}

/// Maps a raw pressure-channel value onto `[0, 1]`.
///
/// The channel reserves values at or below 1.0 for "no contact", so those map
/// to 0.0; `max_raw` and above map to 1.0.
pub fn normalize_pressure(raw: f32, max_raw: f32) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    let span = max_raw - 1.0;
    if !(span > 0.0) || !span.is_finite() {
        return if raw > 1.0 { 1.0 } else { 0.0 };
    }
    ((raw - 1.0) / span).clamp(0.0, 1.0)
}

/// Scale that fits a `device_w` x `device_h` sensor inside a
/// `surface_w` x `surface_h` render surface while keeping its aspect ratio.
///
/// Degenerate extents fall back to 1.0.
pub fn fit_scale(device_w: f32, device_h: f32, surface_w: f32, surface_h: f32) -> f32 {
    if device_w <= 0.0 || device_h <= 0.0 || surface_w <= 0.0 || surface_h <= 0.0 {
        return 1.0;
    }
    let scale = (surface_w / device_w).min(surface_h / device_h);
    if scale.is_finite() { scale } else { 1.0 }
}
