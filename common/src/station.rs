// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use chrono::NaiveDate;
use std::sync::Arc;

use crate::aggregate::{Aggregate, SensorAggregator};
use crate::config::StationConfig;
use crate::error::{PersistenceError, StationError};
use crate::sampler::{BackgroundSampler, Clock, LocalClock};
use crate::sensor::{SensorDriverPointer, SensorReader};
use crate::series::{build_hour_series_lossy, HourPoint};
use crate::store::{DailyLogStore, DailyRecord};
use crate::LatestValue;

/// The running station: configuration, sensor access and the daily logs.
///
/// This is everything a dashboard needs. It is cheap to clone, and all clones share the
/// same driver, store and latest-sample slot.
#[derive(Clone)]
pub struct Station {
    config: Arc<StationConfig>,
    aggregator: SensorAggregator,
    store: DailyLogStore,
    clock: Arc<dyn Clock>,
    latest: LatestValue<Aggregate>,
}

impl Station {
    /// Validates `config` and opens the storage directory. Failing here is the only
    /// fatal error of the system.
    pub fn open(config: StationConfig, driver: SensorDriverPointer) -> Result<Self, StationError> {
        config.validate()?;

        let store = DailyLogStore::open(&config.data_dir)?;
        let reader = SensorReader::new(driver, config.model, config.temperature_offset);

        Ok(Self {
            config: Arc::new(config),
            aggregator: SensorAggregator::new(reader),
            store,
            clock: Arc::new(LocalClock),
            latest: LatestValue::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn temperature_offset(&self) -> f64 {
        self.config.temperature_offset
    }

    /// Reads all sensors now.
    pub fn live_aggregate(&self) -> Aggregate {
        self.aggregator.read_all(&self.config.sensors)
    }

    /// The aggregate of the sampler's most recent cycle, if it ran yet.
    pub fn last_sample(&self) -> Option<Aggregate> {
        self.latest.get()
    }

    pub fn day_records(&self, day: NaiveDate) -> Result<Vec<DailyRecord>, PersistenceError> {
        self.store.load_day(day)
    }

    /// The day's records on the hour axis. Records with a bad time are left out.
    pub fn hour_series(&self, day: NaiveDate) -> Result<Vec<HourPoint>, PersistenceError> {
        Ok(build_hour_series_lossy(&self.store.load_day(day)?))
    }

    pub fn available_days(&self) -> Result<Vec<NaiveDate>, PersistenceError> {
        self.store.days()
    }

    /// Today according to the station's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    /// The sampler writing into this station's store. It publishes into
    /// [`Self::last_sample`].
    pub fn sampler(&self) -> BackgroundSampler {
        BackgroundSampler::new(
            self.aggregator.clone(),
            self.config.sensors.clone(),
            self.store.clone(),
            self.config.interval(),
        )
        .with_clock(self.clock.clone())
        .with_latest(self.latest.clone())
    }

    /// Starts the sampler on a background thread.
    pub fn spawn_sampler(&self) -> Result<std::thread::JoinHandle<()>, StationError> {
        self.sampler().spawn().map_err(StationError::Spawn)
    }
}
