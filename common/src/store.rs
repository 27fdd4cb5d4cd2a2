// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

//! Append-only daily logs: one `YYYY-MM-DD.csv` file per day, one
//! `date,HH:MM,temperature,humidity` row per sampling tick.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{MalformedRecordError, PersistenceError};

/// Rows end like the ones the csv writer of the old station produced.
const ROW_TERMINATOR: &str = "\r\n";

/// One persisted sample: the averaged values of a tick.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DailyRecord {
    pub day: NaiveDate,
    /// `HH:MM`, local time.
    pub time: String,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
}

impl DailyRecord {
    /// The row as written to disk, terminator included.
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{:.1},{:.1}{ROW_TERMINATOR}",
            self.day, self.time, self.avg_temperature, self.avg_humidity
        )
    }

    /// Parses a row without its line terminator.
    pub fn parse_row(line: &str) -> Result<Self, MalformedRecordError> {
        let malformed = |reason| MalformedRecordError {
            line: line.to_owned(),
            reason,
        };

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [day, time, temperature, humidity] = fields[..] else {
            return Err(malformed("expected 4 fields"));
        };

        let day = day
            .parse::<NaiveDate>()
            .map_err(|_| malformed("invalid date"))?;
        if time.is_empty() {
            return Err(malformed("missing time"));
        }
        let avg_temperature = temperature
            .parse::<f64>()
            .map_err(|_| malformed("invalid temperature"))?;
        let avg_humidity = humidity
            .parse::<f64>()
            .map_err(|_| malformed("invalid humidity"))?;

        if !avg_temperature.is_finite() || !avg_humidity.is_finite() {
            return Err(malformed("non-finite value"));
        }

        Ok(Self {
            day,
            time: time.to_owned(),
            avg_temperature,
            avg_humidity,
        })
    }
}

/// The directory of daily logs.
///
/// Only the sampler appends; any number of readers may load concurrently. A row is
/// written with a single append and readers ignore a trailing line that has no
/// terminator yet, so an in-flight append is never seen half written.
#[derive(Clone, Debug)]
pub struct DailyLogStore {
    dir: PathBuf,
}

impl DailyLogStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::Create {
            path: dir.clone(),
            source,
        })?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{day}.csv"))
    }

    /// Appends one record to the log of `day`, creating the log on first use.
    pub fn append(
        &self,
        day: NaiveDate,
        time: &str,
        avg_temperature: f64,
        avg_humidity: f64,
    ) -> Result<DailyRecord, PersistenceError> {
        let record = DailyRecord {
            day,
            time: time.to_owned(),
            avg_temperature,
            avg_humidity,
        };

        let path = self.path_for(day);
        let append_error = |source| PersistenceError::Append {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)
            .map_err(append_error)?;

        // A crash may have left a row without its terminator. Close it off so the new
        // row starts on a line of its own.
        let mut row = String::new();
        if !Self::ends_with_newline(&mut file).map_err(append_error)? {
            row.push_str(ROW_TERMINATOR);
        }
        row.push_str(&record.to_row());

        file.write_all(row.as_bytes()).map_err(append_error)?;
        file.sync_data().map_err(append_error)?;

        Ok(record)
    }

    /// Whether the file is empty or its last byte is a newline.
    fn ends_with_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
        if file.metadata()?.len() == 0 {
            return Ok(true);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }

    /// All records of `day` in the order they were appended. A day without a log
    /// has no records. Rows that cannot be parsed, or that belong to another day,
    /// are skipped with a warning.
    pub fn load_day(&self, day: NaiveDate) -> Result<Vec<DailyRecord>, PersistenceError> {
        let path = self.path_for(day);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::Read { path, source }),
        };

        let content = String::from_utf8_lossy(&bytes);
        // Whatever follows the last newline is an append still in progress.
        let complete = match content.rfind('\n') {
            Some(end) => &content[..=end],
            None => "",
        };

        let mut records = Vec::new();
        for line in complete.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            match DailyRecord::parse_row(line) {
                Ok(record) if record.day == day => records.push(record),
                Ok(record) => log::warn!(
                    "Skipping record of {} in log of {day} ({})",
                    record.day,
                    path.display()
                ),
                Err(e) => log::warn!("Skipping row in {}: {e}", path.display()),
            }
        }

        Ok(records)
    }

    /// Days that have a log, oldest first.
    pub fn days(&self) -> Result<Vec<NaiveDate>, PersistenceError> {
        let read_error = |source| PersistenceError::Read {
            path: self.dir.clone(),
            source,
        };

        let mut days = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }

            if let Some(day) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<NaiveDate>().ok())
            {
                days.push(day);
            }
        }

        days.sort();
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn row_layout_matches_historical_files() {
        let record = DailyRecord {
            day: day(),
            time: "08:00".into(),
            avg_temperature: 21.0,
            avg_humidity: 55.0,
        };

        assert_eq!(record.to_row(), "2024-01-01,08:00,21.0,55.0\r\n");
    }

    #[test]
    fn parse_row_rejects_garbage() {
        assert!(DailyRecord::parse_row("2024-01-01,08:00,20.1,55.0").is_ok());
        assert!(DailyRecord::parse_row("2024-01-01,08:00,20.1").is_err());
        assert!(DailyRecord::parse_row("2024-01-01,08:00,hot,55.0").is_err());
        assert!(DailyRecord::parse_row("yesterday,08:00,20.1,55.0").is_err());
        assert!(DailyRecord::parse_row("2024-01-01,08:00,20.1,55.0,1").is_err());
        assert!(DailyRecord::parse_row("2024-01-01,08:00,NaN,55.0").is_err());
    }

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();

        assert_eq!(store.load_day(day()).unwrap(), vec![]);
        assert_eq!(store.days().unwrap(), vec![]);
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path().join("nested")).unwrap();

        let written = store.append(day(), "06:30", 20.0, 50.0).unwrap();
        store.append(day(), "06:31", 20.1, 50.5).unwrap();

        let records = store.load_day(day()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], written);
        assert_eq!(records[1].time, "06:31");
        assert_eq!(store.load_day(day()).unwrap(), records);
    }

    #[test]
    fn days_do_not_share_logs() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        let next = day().succ_opt().unwrap();

        store.append(next, "00:01", 19.0, 40.0).unwrap();
        store.append(day(), "23:59", 20.0, 41.0).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(store.load_day(day()).unwrap().len(), 1);
        assert_eq!(store.load_day(next).unwrap()[0].avg_temperature, 19.0);
        assert_eq!(store.days().unwrap(), vec![day(), next]);
    }

    #[test]
    fn unterminated_tail_is_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        std::fs::write(
            store.path_for(day()),
            "2024-01-01,08:00,20.1,55.0\n2024-01-01,08:01,20",
        )
        .unwrap();

        let records = store.load_day(day()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].avg_humidity, 55.0);
    }

    #[test]
    fn append_after_torn_tail_starts_a_new_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        std::fs::write(
            store.path_for(day()),
            "2024-01-01,08:00,20.1,55.0\r\n2024-01-01,08:01,20",
        )
        .unwrap();

        let written = store.append(day(), "08:02", 20.3, 55.2).unwrap();
        store.append(day(), "08:03", 20.4, 55.3).unwrap();

        let records = store.load_day(day()).unwrap();
        let times: Vec<_> = records.iter().map(|r| r.time.as_str()).collect();
        assert_eq!(times, ["08:00", "08:02", "08:03"]);
        assert_eq!(records[1], written);

        let raw = std::fs::read_to_string(store.path_for(day())).unwrap();
        assert!(raw.ends_with("2024-01-01,08:03,20.4,55.3\r\n"));
        assert!(!raw.contains("\r\n\r\n"));
    }

    #[test]
    fn rows_of_other_days_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        std::fs::write(
            store.path_for(day()),
            "2023-12-31,23:59,20.1,55.0\n2024-01-01,00:00,20.2,55.1\n",
        )
        .unwrap();

        let records = store.load_day(day()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time, "00:00");
    }

    #[test]
    fn unreadable_log_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyLogStore::open(dir.path()).unwrap();
        std::fs::create_dir(store.path_for(day())).unwrap();

        assert!(matches!(
            store.load_day(day()),
            Err(PersistenceError::Read { .. })
        ));
        assert!(matches!(
            store.append(day(), "08:00", 20.0, 50.0),
            Err(PersistenceError::Append { .. })
        ));
    }
}
