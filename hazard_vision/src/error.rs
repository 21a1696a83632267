// THEORY:
// Every failure the engine can observe has a home here, one enum per concern.
// The split mirrors the failure policy of the monitoring loop: a `SourceError`
// at open time ends a session, a `StoreError` on append is reported and
// swallowed, a `DetectorError` costs one frame and a `CanvasError` one overlay.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the on-disk alert log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no alert bucket for date {0}")]
    UnknownDate(String),

    #[error("no log for zone {zone} on {date}")]
    UnknownZone { date: String, zone: String },

    #[error("invalid date identifier: {0}")]
    InvalidDate(String),

    #[error("zone name {0:?} contains control characters")]
    InvalidZone(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures decoding one line of a zone log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordParseError {
    #[error("missing timestamp prefix")]
    MissingTimestamp,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("unknown risk level token: {0}")]
    UnknownLevel(String),

    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("invalid hazard list: {0}")]
    InvalidHazards(String),
}

/// The video source could not be opened or read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open video source {location}: {reason}")]
    Open { location: String, reason: String },

    #[error("frame read failed: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
#[error("display error: {0}")]
pub struct DisplayError(pub String);

#[derive(Debug, Error)]
#[error("detector error: {0}")]
pub struct DetectorError(pub String);

#[derive(Debug, Error)]
#[error("canvas error: {0}")]
pub struct CanvasError(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("unknown compute device: {0}")]
    UnknownDevice(String),
}
