// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::MalformedTimeError;
use crate::store::DailyRecord;

/// A record placed on a continuous 0-24 hour axis.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct HourPoint {
    pub hour: f64,
    pub temperature: f64,
    pub humidity: f64,
}

/// Axis ranges of the daily chart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlotAxes {
    pub hours: Range<f64>,
    pub hour_tick: f64,
    pub temperature: Range<f64>,
    pub humidity: Range<f64>,
}

impl Default for PlotAxes {
    fn default() -> Self {
        Self {
            hours: 0.0..24.0,
            hour_tick: 1.0,
            temperature: 15.0..26.0,
            humidity: 30.0..70.0,
        }
    }
}

/// Converts `HH:MM` to `hour + minute / 60`.
pub fn hour_fraction(time: &str) -> Result<f64, MalformedTimeError> {
    let malformed = || MalformedTimeError {
        time: time.to_owned(),
    };

    let (hour, minute) = time.split_once(':').ok_or_else(malformed)?;
    let hour: u8 = hour.trim().parse().map_err(|_| malformed())?;
    let minute: u8 = minute.trim().parse().map_err(|_| malformed())?;
    if hour > 23 || minute > 59 {
        return Err(malformed());
    }

    Ok(f64::from(hour) + f64::from(minute) / 60.0)
}

impl TryFrom<&DailyRecord> for HourPoint {
    type Error = MalformedTimeError;

    fn try_from(record: &DailyRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            hour: hour_fraction(&record.time)?,
            temperature: record.avg_temperature,
            humidity: record.avg_humidity,
        })
    }
}

/// Builds the series in record order, failing on the first bad time of day.
pub fn build_hour_series(records: &[DailyRecord]) -> Result<Vec<HourPoint>, MalformedTimeError> {
    records.iter().map(HourPoint::try_from).collect()
}

/// Builds the series in record order, skipping records with a bad time of day.
pub fn build_hour_series_lossy(records: &[DailyRecord]) -> Vec<HourPoint> {
    records
        .iter()
        .filter_map(|record| match HourPoint::try_from(record) {
            Ok(point) => Some(point),
            Err(e) => {
                log::warn!("Skipping record of {}: {e}", record.day);
                None
            }
        })
        .collect()
}
