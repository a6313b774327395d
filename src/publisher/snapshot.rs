//! Sensor snapshot type shared between the host loop and the publisher

use serde::Serialize;

/// The most recently accepted set of sensor readings awaiting publication.
///
/// Each field is independently optional: `None` means the sensor did not
/// report this cycle, and the publisher skips the field instead of sending
/// a zero reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Temperature in °C
    pub temperature: Option<f32>,

    /// Relative humidity in %RH
    pub relative_humidity: Option<f32>,

    /// Absolute humidity in g/m³
    pub absolute_humidity: Option<f32>,

    /// Air quality VOC raw index
    pub air_quality_voc: Option<u32>,

    /// Air quality CO2-equivalent raw ppm
    pub air_quality_co2eq: Option<u32>,

    /// Illuminance as raw sensor count (unsigned on the wire)
    pub light: Option<u32>,

    /// Air pressure in hPa
    pub air_pressure: Option<f32>,
}

impl TelemetrySnapshot {
    /// Whether at least one reading is present
    pub fn has_readings(&self) -> bool {
        self.temperature.is_some()
            || self.relative_humidity.is_some()
            || self.absolute_humidity.is_some()
            || self.air_quality_voc.is_some()
            || self.air_quality_co2eq.is_some()
            || self.light.is_some()
            || self.air_pressure.is_some()
    }
}
