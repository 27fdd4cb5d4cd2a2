// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::config::SensorConfig;
use crate::sensor::{Reading, SensorReader};
use crate::value::{mean1, Value};

/// All sensors' readings of one cycle plus their averages.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Aggregate {
    pub per_sensor: Vec<Reading>,
    pub avg_temperature: Value,
    pub avg_humidity: Value,
}

impl Aggregate {
    /// Averages the readings. Temperature and humidity are averaged independently over
    /// the sensors that produced that quantity.
    pub fn from_readings(per_sensor: Vec<Reading>) -> Self {
        let temperatures: Vec<f64> = per_sensor
            .iter()
            .filter_map(|r| r.temperature_celsius.number())
            .collect();
        let humidities: Vec<f64> = per_sensor
            .iter()
            .filter_map(|r| r.humidity_percent.number())
            .collect();

        Self {
            avg_temperature: mean1(&temperatures).into(),
            avg_humidity: mean1(&humidities).into(),
            per_sensor,
        }
    }

    /// Both averages, if both are available.
    pub fn averages(&self) -> Option<(f64, f64)> {
        Some((self.avg_temperature.number()?, self.avg_humidity.number()?))
    }
}

/// Reads every configured sensor, one after the other.
#[derive(Clone)]
pub struct SensorAggregator {
    reader: SensorReader,
}

impl SensorAggregator {
    pub fn new(reader: SensorReader) -> Self {
        Self { reader }
    }

    /// Reads the sensors in configuration order. Never fails: sensors that cannot be
    /// read show up as unavailable, and so do averages nobody contributed to.
    pub fn read_all(&self, sensors: &[SensorConfig]) -> Aggregate {
        let readings = sensors.iter().map(|s| self.reader.reading(s)).collect();
        let aggregate = Aggregate::from_readings(readings);

        if aggregate.averages().is_none() {
            log::warn!("No valid readings from {} sensors", sensors.len());
        }

        aggregate
    }
}
