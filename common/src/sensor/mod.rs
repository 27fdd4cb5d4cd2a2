// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

mod dht;
mod dummy;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SensorConfig;
use crate::value::{round1, Value};

pub use dht::{decode, DhtError, RetryPolicy};
#[cfg(feature = "gpio")]
pub use dht::GpioDhtDriver;
pub use dummy::DummySensorDriver;

/// The supported single-wire sensor families.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorModel {
    #[default]
    Dht11,
    Dht22,
}

/// Blocking access to the physical sensors.
///
/// A single call may take as long as the driver's retry policy allows. It returns
/// `(humidity, temperature)` or `None` when no valid frame could be read.
pub trait SensorDriver: Send + Sync {
    fn read(&self, model: SensorModel, channel: u8) -> Option<(f32, f32)>;
}

pub type SensorDriverPointer = Arc<dyn SensorDriver>;

/// One sensor's contribution to a sampling tick.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reading {
    pub sensor_name: String,
    pub temperature_celsius: Value,
    pub humidity_percent: Value,
}

/// Reads a single sensor and normalizes its output.
#[derive(Clone)]
pub struct SensorReader {
    driver: SensorDriverPointer,
    model: SensorModel,
    temperature_offset: f64,
}

impl SensorReader {
    pub fn new(driver: SensorDriverPointer, model: SensorModel, temperature_offset: f64) -> Self {
        Self {
            driver,
            model,
            temperature_offset,
        }
    }

    /// Returns `(temperature, humidity)`, both rounded to one decimal, with the calibration
    /// offset added to the temperature before rounding. `None` if the driver gave up.
    pub fn read(&self, channel: u8) -> Option<(f64, f64)> {
        let (humidity, temperature) = self.driver.read(self.model, channel)?;

        let temperature = round1(f64::from(temperature) + self.temperature_offset);
        let humidity = round1(f64::from(humidity));
        Some((temperature, humidity))
    }

    /// Reads the configured sensor into a [`Reading`]. A failed read marks both
    /// quantities unavailable.
    pub fn reading(&self, sensor: &SensorConfig) -> Reading {
        let (temperature_celsius, humidity_percent) = match self.read(sensor.channel) {
            Some((t, h)) => (Value::Number(t), Value::Number(h)),
            None => {
                log::warn!("Failed to read {} on channel {}", sensor.name, sensor.channel);
                (Value::Unavailable, Value::Unavailable)
            }
        };

        Reading {
            sensor_name: sensor.name.clone(),
            temperature_celsius,
            humidity_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(offset: f64) -> SensorReader {
        let driver = DummySensorDriver::default()
            .with_channel(4, 55.04, 24.26)
            .with_failing_channel(24);
        SensorReader::new(Arc::new(driver), SensorModel::Dht11, offset)
    }

    #[test]
    fn offset_is_applied_before_rounding() {
        let (t, h) = reader(-4.0).read(4).unwrap();
        assert_eq!(t, 20.3);
        assert_eq!(h, 55.0);
    }

    #[test]
    fn failure_is_never_partial() {
        let reader = reader(0.0);
        assert_eq!(reader.read(24), None);

        let reading = reader.reading(&SensorConfig::new("porch", 24));
        assert_eq!(reading.sensor_name, "porch");
        assert_eq!(reading.temperature_celsius, Value::Unavailable);
        assert_eq!(reading.humidity_percent, Value::Unavailable);
    }

    #[test]
    fn unknown_channel_reads_as_failure() {
        assert_eq!(reader(0.0).read(17), None);
    }
}
