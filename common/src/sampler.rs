// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use chrono::{NaiveDateTime, Timelike};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::aggregate::{Aggregate, SensorAggregator};
use crate::config::SensorConfig;
use crate::store::{DailyLogStore, DailyRecord};
use crate::LatestValue;

/// Source of the wall-clock time that records are filed under.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The local time of the machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// What one sampling cycle did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Logged(DailyRecord),
    /// At least one average was unavailable, nothing was written.
    Skipped,
    /// The record could not be written. The error has been logged.
    PersistenceFailed,
}

/// Periodically reads all sensors and appends the averages to the day's log.
///
/// The sampler is the only writer of the store. The pause is taken after every cycle,
/// so the effective period is the time the reads took plus the interval. Nothing that
/// happens during a cycle stops the loop.
pub struct BackgroundSampler {
    aggregator: SensorAggregator,
    sensors: Vec<SensorConfig>,
    store: DailyLogStore,
    interval: Duration,
    clock: Arc<dyn Clock>,
    latest: LatestValue<Aggregate>,
}

impl BackgroundSampler {
    pub fn new(
        aggregator: SensorAggregator,
        sensors: Vec<SensorConfig>,
        store: DailyLogStore,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            sensors,
            store,
            interval,
            clock: Arc::new(LocalClock),
            latest: LatestValue::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publishes every cycle's aggregate into `latest`.
    pub fn with_latest(mut self, latest: LatestValue<Aggregate>) -> Self {
        self.latest = latest;
        self
    }

    pub fn latest(&self) -> LatestValue<Aggregate> {
        self.latest.clone()
    }

    /// Runs a single read-aggregate-log cycle.
    pub fn tick(&self) -> TickOutcome {
        let aggregate = self.aggregator.read_all(&self.sensors);
        let averages = aggregate.averages();
        self.latest.set(aggregate);

        let Some((temperature, humidity)) = averages else {
            return TickOutcome::Skipped;
        };

        let now = self.clock.now();
        let time = format!("{:02}:{:02}", now.hour(), now.minute());

        match self.store.append(now.date(), &time, temperature, humidity) {
            Ok(record) => {
                log::info!(
                    "Logged {} {}: {:.1}°C, {:.1}%",
                    record.day,
                    record.time,
                    record.avg_temperature,
                    record.avg_humidity
                );
                TickOutcome::Logged(record)
            }
            Err(e) => {
                log::error!("Failed to persist sample: {e:?}");
                TickOutcome::PersistenceFailed
            }
        }
    }

    /// Runs `count` cycles with the usual pause between them.
    pub fn run_ticks(&self, count: usize) -> Vec<TickOutcome> {
        let mut outcomes = Vec::with_capacity(count);
        for n in 0..count {
            outcomes.push(self.tick());
            if n + 1 < count {
                std::thread::sleep(self.interval);
            }
        }
        outcomes
    }

    /// Samples until the process ends.
    pub fn run(&self) {
        log::info!(
            "Sampling {} sensors every {:?} into {}",
            self.sensors.len(),
            self.interval,
            self.store.dir().display()
        );

        loop {
            self.tick();
            std::thread::sleep(self.interval);
        }
    }

    /// Starts [`Self::run`] on its own thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("sampler".into())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{DummySensorDriver, SensorModel, SensorReader};
    use crate::value::Value;
    use chrono::NaiveDate;

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn sampler(driver: DummySensorDriver, store: DailyLogStore) -> BackgroundSampler {
        let reader = SensorReader::new(Arc::new(driver), SensorModel::Dht11, 0.0);
        let sensors = vec![SensorConfig::new("a", 4), SensorConfig::new("b", 24)];
        let noon = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 5, 42)
            .unwrap();

        BackgroundSampler::new(
            SensorAggregator::new(reader),
            sensors,
            store,
            Duration::from_millis(1),
        )
        .with_clock(Arc::new(FixedClock(noon)))
    }

    #[test]
    fn tick_files_record_under_clock_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        let driver = DummySensorDriver::default()
            .with_channel(4, 50.0, 20.0)
            .with_channel(24, 60.0, 22.0);

        let outcome = sampler(driver, store.clone()).tick();

        let TickOutcome::Logged(record) = outcome else {
            panic!("expected a logged record, got {outcome:?}");
        };
        assert_eq!(record.day, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(record.time, "12:05");
        assert_eq!(store.load_day(record.day).unwrap(), vec![record]);
    }

    #[test]
    fn failing_sensors_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        let sampler = sampler(DummySensorDriver::default(), store.clone());

        assert_eq!(sampler.run_ticks(2), vec![TickOutcome::Skipped; 2]);
        assert_eq!(store.days().unwrap(), vec![]);

        let latest = sampler.latest().get().unwrap();
        assert_eq!(latest.avg_temperature, Value::Unavailable);
    }

    #[test]
    fn persistence_failure_does_not_stop_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        // a directory where the log file should be makes every append fail
        std::fs::create_dir(store.path_for(day)).unwrap();
        let driver = DummySensorDriver::default().with_channel(4, 50.0, 20.0);

        let outcomes = sampler(driver, store).run_ticks(3);

        assert_eq!(outcomes, vec![TickOutcome::PersistenceFailed; 3]);
    }
}
