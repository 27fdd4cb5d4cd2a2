// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

//! Sampling and persistence core of a two-sensor temperature/humidity station.
//!
//! The write path is [`sampler::BackgroundSampler`] → [`aggregate::SensorAggregator`]
//! → [`store::DailyLogStore`]. The read path used by a dashboard goes through
//! [`station::Station`], which hands out live aggregates, a day's records and the
//! hour-of-day series built by [`series`].

pub mod aggregate;
pub mod config;
pub mod error;
pub mod sampler;
pub mod sensor;
pub mod series;
pub mod station;
pub mod store;
pub mod value;

pub use aggregate::{Aggregate, SensorAggregator};
pub use config::{SensorConfig, StationConfig};
pub use error::{ConfigError, MalformedRecordError, MalformedTimeError, PersistenceError, StationError};
pub use sampler::{BackgroundSampler, Clock, LocalClock, TickOutcome};
pub use sensor::{Reading, SensorDriver, SensorModel, SensorReader};
pub use series::{HourPoint, PlotAxes};
pub use station::Station;
pub use store::{DailyLogStore, DailyRecord};
pub use value::Value;

/// Convenience helper for passing the last of a value between threads. For example from the
/// sampling thread to whatever serves the dashboard.
///
/// Unlike a channel, readers never consume the value: every reader sees the most recently
/// published one until it is replaced.
#[derive(Debug)]
pub struct LatestValue<T>(std::sync::Arc<std::sync::Mutex<Option<T>>>);

impl<T> Clone for LatestValue<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for LatestValue<T> {
    fn default() -> Self {
        Self(Default::default())
    }
}

impl<T: Clone> LatestValue<T> {
    /// Publishes `value`, replacing the previous one.
    ///
    /// # Panics
    ///
    /// If the locking the interally used mutex fails.
    pub fn set(&self, value: T) {
        let mut data = self.0.lock().unwrap();
        let _ = data.insert(value);
    }

    /// Gets a copy of the most recently published value.
    ///
    /// # Panics
    ///
    /// If the locking of the mutex fails
    pub fn get(&self) -> Option<T> {
        let data = self.0.lock().unwrap();
        data.clone()
    }
}

#[test]
fn test_latest_value_is_shared_and_not_consumed() {
    let slot = LatestValue::default();
    let reader = slot.clone();
    assert_eq!(reader.get(), None);

    slot.set(1);
    slot.set(2);
    assert_eq!(reader.get(), Some(2));
    assert_eq!(reader.get(), Some(2));
}
