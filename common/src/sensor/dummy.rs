// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Mutex;

use crate::sensor::{SensorDriver, SensorModel};

/// A driver that answers from a fixed table instead of hardware.
///
/// Channels that were never configured read as failures. Every read is recorded so
/// callers can check which channels were polled and in which order.
#[derive(Default)]
pub struct DummySensorDriver {
    channels: HashMap<u8, Option<(f32, f32)>>,
    polled: Mutex<Vec<u8>>,
}

impl DummySensorDriver {
    /// Makes `channel` report `humidity` and `temperature` on every read.
    pub fn with_channel(mut self, channel: u8, humidity: f32, temperature: f32) -> Self {
        self.channels.insert(channel, Some((humidity, temperature)));
        self
    }

    /// Makes `channel` fail on every read.
    pub fn with_failing_channel(mut self, channel: u8) -> Self {
        self.channels.insert(channel, None);
        self
    }

    /// The channels read so far, oldest first.
    ///
    /// # Panics
    ///
    /// If the locking of the mutex fails
    pub fn polled(&self) -> Vec<u8> {
        self.polled.lock().unwrap().clone()
    }
}

impl SensorDriver for DummySensorDriver {
    fn read(&self, _model: SensorModel, channel: u8) -> Option<(f32, f32)> {
        self.polled.lock().unwrap().push(channel);
        self.channels.get(&channel).copied().flatten()
    }
}

#[test]
fn test_dummy_sensor_driver() {
    let driver = DummySensorDriver::default()
        .with_channel(4, 50.0, 20.0)
        .with_failing_channel(24);

    assert_eq!(driver.read(SensorModel::Dht11, 4), Some((50.0, 20.0)));
    assert_eq!(driver.read(SensorModel::Dht22, 24), None);
    assert_eq!(driver.read(SensorModel::Dht11, 5), None);
    assert_eq!(driver.polled(), vec![4, 24, 5]);
}
