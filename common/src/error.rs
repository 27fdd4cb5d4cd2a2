// Copyright © The dht-station authors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;

/// The storage medium could not be written or read.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cannot create storage directory {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot append to {path}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A persisted row that does not have the `date,time,temp,hum` shape.
#[derive(Debug, Error, PartialEq)]
#[error("malformed record {line:?}: {reason}")]
pub struct MalformedRecordError {
    pub line: String,
    pub reason: &'static str,
}

/// A time of day that is not `HH:MM`.
#[derive(Debug, Error, PartialEq)]
#[error("malformed time of day {time:?}, expected HH:MM")]
pub struct MalformedTimeError {
    pub time: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`crate::Station`].
#[derive(Debug, Error)]
pub enum StationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("cannot spawn sampler thread")]
    Spawn(#[source] std::io::Error),
}
