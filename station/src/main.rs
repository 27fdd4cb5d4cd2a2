use std::path::PathBuf;
use std::sync::Arc;

use dht_station_common::sensor::SensorDriverPointer;
use dht_station_common::{Station, StationConfig};

/// Our App struct that holds the station and decides how it runs.
///
/// The station owns the sensors and the daily logs. In the normal mode the sampler thread
/// writes into the logs for as long as the process lives; a dashboard reads through the
/// same [`Station`].
struct App {
    station: Station,
}

impl App {
    const PROBE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

    /// Create a new App struct.
    ///
    /// Loads the config and opens the station. An unusable storage directory ends the
    /// process here, before any sampling starts.
    fn new(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = StationConfig::discover(config_path)?;
        log::info!(
            "{} sensors ({:?}), offset {:.1}°C, logs in {}",
            config.sensors.len(),
            config.model,
            config.temperature_offset,
            config.data_dir.display()
        );

        let driver = Self::driver(&config);
        let station = Station::open(config, driver)?;

        Ok(Self { station })
    }

    /// Real GPIO access if compiled in, otherwise a dummy driver that always fails.
    #[cfg(feature = "gpio")]
    fn driver(config: &StationConfig) -> SensorDriverPointer {
        Arc::new(dht_station_common::sensor::GpioDhtDriver::new(config.retry))
    }

    #[cfg(not(feature = "gpio"))]
    fn driver(_config: &StationConfig) -> SensorDriverPointer {
        log::warn!("Built without GPIO support, every sensor read will fail");
        Arc::new(dht_station_common::sensor::DummySensorDriver::default())
    }

    /// Run the sampler until the process is stopped.
    fn run(&self) -> anyhow::Result<()> {
        let sampler = self.station.spawn_sampler()?;

        sampler
            .join()
            .map_err(|_| anyhow::anyhow!("sampler thread panicked"))
    }

    /// Print every sensor's reading once per second, to check the wiring.
    fn probe(&self) -> anyhow::Result<()> {
        loop {
            for reading in self.station.live_aggregate().per_sensor {
                if reading.temperature_celsius.is_available() {
                    log::info!(
                        "{}: {} °C   Humidity: {} %",
                        reading.sensor_name,
                        reading.temperature_celsius,
                        reading.humidity_percent
                    );
                } else {
                    log::warn!(
                        "{}: failed to read from sensor, check wiring/model",
                        reading.sensor_name
                    );
                }
            }

            std::thread::sleep(Self::PROBE_INTERVAL);
        }
    }
}

/// A minimal main function that initializes the App and runs it.
///
/// `dht-station [CONFIG]` samples forever, `dht-station probe [CONFIG]` only reads.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1).peekable();
    let probe = args.next_if(|arg| arg == "probe").is_some();
    let config_path = args.next().map(PathBuf::from);

    let app = App::new(config_path)?;

    if probe {
        app.probe()
    } else {
        app.run()
    }
}
