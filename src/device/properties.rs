//! Property queries against a connected device.

use crate::connection::{CancelToken, DeviceLink, cancellable};
use crate::ink::mapper::{Transform, compute_transform_at_dpi};
use thiserror::Error;

/// Properties a connected pad can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    DeviceName,
    SerialNumber,
    Width,
    Height,
    PointSize,
    SamplingRate,
    BatteryLevel,
}

impl DeviceProperty {
    /// Short label used in property listings.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceProperty::DeviceName => "Name",
            DeviceProperty::SerialNumber => "ESN",
            DeviceProperty::Width => "Width",
            DeviceProperty::Height => "Height",
            DeviceProperty::PointSize => "Point",
            DeviceProperty::SamplingRate => "Rate",
            DeviceProperty::BatteryLevel => "Battery",
        }
    }
}

/// Value returned by a property query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Unsigned(u32),
    Signed(i32),
}

impl PropertyValue {
    fn into_text(self, property: DeviceProperty) -> Result<String, PropertyQueryError> {
        match self {
            PropertyValue::Text(text) => Ok(text),
            _ => Err(PropertyQueryError::Unsupported(property.label())),
        }
    }

    fn into_unsigned(self, property: DeviceProperty) -> Result<u32, PropertyQueryError> {
        match self {
            PropertyValue::Unsigned(value) => Ok(value),
            PropertyValue::Signed(value) if value >= 0 => Ok(value as u32),
            _ => Err(PropertyQueryError::Unsupported(property.label())),
        }
    }

    fn into_signed(self, property: DeviceProperty) -> Result<i32, PropertyQueryError> {
        match self {
            PropertyValue::Signed(value) => Ok(value),
            PropertyValue::Unsigned(value) => {
                i32::try_from(value).map_err(|_| PropertyQueryError::Unsupported(property.label()))
            }
            PropertyValue::Text(_) => Err(PropertyQueryError::Unsupported(property.label())),
        }
    }
}

/// Errors reported by a device link for property queries and feed control.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyQueryError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("link to the device was lost")]
    LinkLost,

    #[error("property '{0}' is not supported by this device")]
    Unsupported(&'static str),
}

/// Queries one property, settling as `Cancelled` as soon as the token fires.
pub async fn query_property(
    link: &dyn DeviceLink,
    property: DeviceProperty,
    cancel: &CancelToken,
) -> Result<PropertyValue, PropertyQueryError> {
    cancellable(cancel, link.get_property(property, cancel))
        .await
        .unwrap_or(Err(PropertyQueryError::Cancelled))
}

/// Sensor extents needed to scale the real-time feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkExtents {
    pub width: u32,
    pub height: u32,
    pub point_pitch_um: u32,
}

impl InkExtents {
    pub async fn query(
        link: &dyn DeviceLink,
        cancel: &CancelToken,
    ) -> Result<Self, PropertyQueryError> {
        let width = query_property(link, DeviceProperty::Width, cancel)
            .await?
            .into_unsigned(DeviceProperty::Width)?;
        let height = query_property(link, DeviceProperty::Height, cancel)
            .await?
            .into_unsigned(DeviceProperty::Height)?;
        let point_pitch_um = query_property(link, DeviceProperty::PointSize, cancel)
            .await?
            .into_unsigned(DeviceProperty::PointSize)?;

        Ok(Self {
            width,
            height,
            point_pitch_um,
        })
    }

    /// Page transform for rendering the sensor area at `target_dpi`.
    pub fn page_transform(&self, target_dpi: f32) -> Transform {
        compute_transform_at_dpi(self.width, self.height, self.point_pitch_um, target_dpi)
    }
}

/// Full property listing of a connected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: String,
    pub serial_number: String,
    pub extents: InkExtents,
    pub sampling_rate: u32,
    /// Battery charge in percent; `None` when the device does not report it.
    pub battery_percent: Option<i32>,
}

impl DeviceProperties {
    /// Queries every property in turn. Any failure aborts the whole listing,
    /// except an unsupported battery level which is reported as `None`.
    pub async fn query(
        link: &dyn DeviceLink,
        cancel: &CancelToken,
    ) -> Result<Self, PropertyQueryError> {
        let name = query_property(link, DeviceProperty::DeviceName, cancel)
            .await?
            .into_text(DeviceProperty::DeviceName)?;
        let serial_number = query_property(link, DeviceProperty::SerialNumber, cancel)
            .await?
            .into_text(DeviceProperty::SerialNumber)?;
        let extents = InkExtents::query(link, cancel).await?;
        let sampling_rate = query_property(link, DeviceProperty::SamplingRate, cancel)
            .await?
            .into_unsigned(DeviceProperty::SamplingRate)?;
        let battery_percent = match query_property(link, DeviceProperty::BatteryLevel, cancel).await
        {
            Ok(value) => Some(value.into_signed(DeviceProperty::BatteryLevel)?),
            Err(PropertyQueryError::Unsupported(_)) => None,
            Err(err) => return Err(err),
        };

        Ok(Self {
            name,
            serial_number,
            extents,
            sampling_rate,
            battery_percent,
        })
    }

    /// Label/value rows for display. Missing values read `N/A`.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            (DeviceProperty::DeviceName.label(), self.name.clone()),
            (DeviceProperty::SerialNumber.label(), self.serial_number.clone()),
            (DeviceProperty::Width.label(), self.extents.width.to_string()),
            (DeviceProperty::Height.label(), self.extents.height.to_string()),
            (
                DeviceProperty::PointSize.label(),
                self.extents.point_pitch_um.to_string(),
            ),
            (
                DeviceProperty::SamplingRate.label(),
                self.sampling_rate.to_string(),
            ),
            (
                DeviceProperty::BatteryLevel.label(),
                self.battery_percent
                    .map_or_else(|| "N/A".to_string(), |level| format!("{level}%")),
            ),
        ]
    }
}
