// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sensor::SensorModel;

/// Number of bytes in one DHT frame: humidity (2), temperature (2), checksum.
pub const MAX_DHT_DATA: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum DhtError {
    #[error("gpio: {0}")]
    Gpio(String),
    #[error("sensor did not answer in time")]
    Timeout,
    #[error("checksum mismatch")]
    Checksum,
}

/// How often a failed read is attempted again before the sensor is reported as failing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 15,
            delay_secs: 2,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Calls `attempt` until it succeeds or the attempts are used up, sleeping `delay`
    /// between attempts.
    pub fn run<T, E: std::fmt::Display>(
        &self,
        mut attempt: impl FnMut() -> Result<T, E>,
    ) -> Option<T> {
        for n in 1..=self.attempts {
            match attempt() {
                Ok(value) => return Some(value),
                Err(e) => log::debug!("Attempt {n}/{} failed: {e}", self.attempts),
            }

            if n < self.attempts {
                std::thread::sleep(self.delay());
            }
        }

        None
    }
}

/// Decodes a raw frame into `(humidity, temperature)`.
pub fn decode(model: SensorModel, data: &[u8; MAX_DHT_DATA]) -> Result<(f32, f32), DhtError> {
    // Checksum is the sum of the four data bytes masked to 8 bits
    let sum = data[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if data[4] != sum {
        return Err(DhtError::Checksum);
    }

    let (humidity, temperature) = match model {
        SensorModel::Dht11 => {
            let humidity = data[0] as f32 + data[1] as f32 / 10.0;
            let mut temperature = data[2] as f32 + (data[3] & 0x7F) as f32 / 10.0;
            if data[3] & 0x80 != 0 {
                temperature *= -1.0;
            }
            (humidity, temperature)
        }
        SensorModel::Dht22 => {
            let humidity = u16::from_be_bytes([data[0], data[1]]) as f32 / 10.0;
            let mut temperature = u16::from_be_bytes([data[2] & 0x7F, data[3]]) as f32 / 10.0;
            // negative temp, brrr it's freezing
            if data[2] & 0x80 != 0 {
                temperature *= -1.0;
            }
            (humidity, temperature)
        }
    };

    Ok((humidity, temperature))
}

#[cfg(feature = "gpio")]
pub use gpio::GpioDhtDriver;

#[cfg(feature = "gpio")]
mod gpio {
    use rppal::gpio::{Gpio, IoPin, Level, Mode};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use super::{decode, DhtError, RetryPolicy, MAX_DHT_DATA};
    use crate::sensor::{SensorDriver, SensorModel};

    impl From<rppal::gpio::Error> for DhtError {
        fn from(e: rppal::gpio::Error) -> Self {
            DhtError::Gpio(e.to_string())
        }
    }

    /// Bit-banged DHT11/DHT22 reads on Raspberry Pi GPIO pins (BCM numbering).
    pub struct GpioDhtDriver {
        retry: RetryPolicy,
        // One transaction on the bus at a time.
        bus: Mutex<()>,
    }

    impl GpioDhtDriver {
        const RESPONSE_TIMEOUT: Duration = Duration::from_micros(200);
        const BIT_TIMEOUT: Duration = Duration::from_micros(150);
        const ONE_THRESHOLD: Duration = Duration::from_micros(50);

        pub fn new(retry: RetryPolicy) -> Self {
            Self {
                retry,
                bus: Mutex::new(()),
            }
        }

        /// Busy-waits while the pin stays at `level`, returning how long that took.
        fn signal_length(pin: &IoPin, level: Level, max_wait: Duration) -> Result<Duration, DhtError> {
            let start = Instant::now();
            while pin.read() == level {
                if start.elapsed() > max_wait {
                    return Err(DhtError::Timeout);
                }
            }

            Ok(start.elapsed())
        }

        fn read_frame(model: SensorModel, channel: u8) -> Result<[u8; MAX_DHT_DATA], DhtError> {
            let mut pin = Gpio::new()?.get(channel)?.into_io(Mode::Output);
            let mut dht_data = [0u8; MAX_DHT_DATA];

            // pull down long enough to wake the sensor up
            pin.set_low();
            std::thread::sleep(match model {
                SensorModel::Dht11 => Duration::from_millis(18),
                SensorModel::Dht22 => Duration::from_millis(3),
            });

            // release the line and listen
            pin.set_high();
            pin.set_mode(Mode::Input);

            // == DHT answers by keeping the line low for 80 us and then high for 80 us ====
            Self::signal_length(&pin, Level::High, Self::RESPONSE_TIMEOUT)?;
            Self::signal_length(&pin, Level::Low, Self::RESPONSE_TIMEOUT)?;
            Self::signal_length(&pin, Level::High, Self::RESPONSE_TIMEOUT)?;

            // == read the 40 data bits ================
            for bit in 0..MAX_DHT_DATA * 8 {
                // each bit starts with a ~50 us low
                Self::signal_length(&pin, Level::Low, Self::BIT_TIMEOUT)?;

                // a long high is a 1, a short one a 0
                let high = Self::signal_length(&pin, Level::High, Self::BIT_TIMEOUT)?;
                if high > Self::ONE_THRESHOLD {
                    dht_data[bit / 8] |= 1 << (7 - bit % 8);
                }
            }

            Ok(dht_data)
        }
    }

    impl SensorDriver for GpioDhtDriver {
        fn read(&self, model: SensorModel, channel: u8) -> Option<(f32, f32)> {
            let _bus = self.bus.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            self.retry
                .run(|| Self::read_frame(model, channel).and_then(|frame| decode(model, &frame)))
        }
    }
}
