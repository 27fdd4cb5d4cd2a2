// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::sensor::{RetryPolicy, SensorModel};

/// Environment variable naming the config file when none is given on the command line.
pub const CONFIG_ENV: &str = "DHT_STATION_CONFIG";

/// A physical sensor and the GPIO pin (BCM numbering) it is wired to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SensorConfig {
    pub name: String,
    pub channel: u8,
}

impl SensorConfig {
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            name: name.into(),
            channel,
        }
    }
}

/// Everything the station needs at startup. Never changes while running.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    pub model: SensorModel,

    /// Sensors in the order they are read and shown.
    pub sensors: Vec<SensorConfig>,

    /// Pause after each sampling cycle.
    pub interval_secs: u64,

    /// Directory holding one `YYYY-MM-DD.csv` log per day.
    pub data_dir: PathBuf,

    /// Added to every raw temperature, in °C.
    pub temperature_offset: f64,

    pub retry: RetryPolicy,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            model: SensorModel::Dht11,
            sensors: vec![
                SensorConfig::new("Sensor 1 (GPIO4)", 4),
                SensorConfig::new("Sensor 2 (GPIO24)", 24),
            ],
            interval_secs: 60,
            data_dir: PathBuf::from("data"),
            temperature_offset: -4.0,
            retry: RetryPolicy::default(),
        }
    }
}

impl StationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::from_json_str(&json)
    }

    /// Loads the config from `path`, falling back to [`CONFIG_ENV`] and then to
    /// `station.json` in the platform config directory. Without any file the defaults
    /// are used.
    pub fn discover(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = explicit {
            return Self::load(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                log::warn!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::Invalid("no sensors configured".into()));
        }

        let mut names = HashSet::new();
        for sensor in &self.sensors {
            if !names.insert(sensor.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sensor name {:?}",
                    sensor.name
                )));
            }
        }

        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("interval_secs must be positive".into()));
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid("retry.attempts must be positive".into()));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// `station.json` inside the platform's config directory, if there is one.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dht-station")
        .map(|dirs| dirs.config_dir().join("station.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_matches_defaults() {
        let json = std::include_str!("../../station.example.json");
        assert_eq!(StationConfig::from_json_str(json).unwrap(), StationConfig::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = StationConfig::from_json_str(r#"{ "interval_secs": 30 }"#).unwrap();

        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.model, SensorModel::Dht11);
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors[0].channel, 4);
        assert_eq!(config.temperature_offset, -4.0);
        assert_eq!(config.retry.attempts, 15);
    }

    #[test]
    fn parses_full_config() {
        let config = StationConfig::from_json_str(
            r#"{
                "model": "dht22",
                "sensors": [{ "name": "attic", "channel": 17 }],
                "data_dir": "/var/lib/station",
                "temperature_offset": 0.5,
                "retry": { "attempts": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.model, SensorModel::Dht22);
        assert_eq!(config.sensors, vec![SensorConfig::new("attic", 17)]);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/station"));
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.delay_secs, 2);
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = StationConfig::from_json_str(
            r#"{ "sensors": [{ "name": "a", "channel": 4 }, { "name": "a", "channel": 5 }] }"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_interval_and_empty_sensors() {
        assert!(StationConfig::from_json_str(r#"{ "interval_secs": 0 }"#).is_err());
        assert!(StationConfig::from_json_str(r#"{ "sensors": [] }"#).is_err());
        assert!(matches!(
            StationConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = StationConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
