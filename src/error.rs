// src/error.rs
//! Error types for the GPS time sync service

use std::fmt;

pub type Result<T> = std::result::Result<T, TimeSyncError>;

/// Host-level failures: opening the feed, reading config, touching the clock.
#[derive(Debug)]
pub enum TimeSyncError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    Config(String),
    Clock(String),
    Other(String),
}

impl fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSyncError::Io(e) => write!(f, "IO error: {}", e),
            TimeSyncError::Serial(e) => write!(f, "Serial error: {}", e),
            TimeSyncError::Json(e) => write!(f, "JSON error: {}", e),
            TimeSyncError::Connection(msg) => write!(f, "Connection error: {}", msg),
            TimeSyncError::Config(msg) => write!(f, "Config error: {}", msg),
            TimeSyncError::Clock(msg) => write!(f, "Clock error: {}", msg),
            TimeSyncError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for TimeSyncError {}

impl From<std::io::Error> for TimeSyncError {
    fn from(error: std::io::Error) -> Self {
        TimeSyncError::Io(error)
    }
}

impl From<tokio_serial::Error> for TimeSyncError {
    fn from(error: tokio_serial::Error) -> Self {
        TimeSyncError::Serial(error)
    }
}

impl From<serde_json::Error> for TimeSyncError {
    fn from(error: serde_json::Error) -> Self {
        TimeSyncError::Json(error)
    }
}

/// Which GPRMC token failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeField {
    /// Field 1, `HHMMSS.ss`
    Time,
    /// Field 9, `DDMMYY`
    Date,
}

impl fmt::Display for DateTimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeField::Time => write!(f, "time"),
            DateTimeField::Date => write!(f, "date"),
        }
    }
}

/// Why a GPS time could not be turned into a clock update.
///
/// None of these are fatal. The controller logs them and waits for the next fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    NotGprmc,
    TooFewFields { found: usize },
    MalformedDateTime { field: DateTimeField, token: String },
    NoDataYet,
    Overflow,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::NotGprmc => write!(f, "not a GPRMC sentence"),
            ParseFailure::TooFewFields { found } => {
                write!(f, "GPRMC sentence has {} fields, need at least 10", found)
            }
            ParseFailure::MalformedDateTime { field, token } => {
                write!(f, "malformed {} field: {:?}", field, token)
            }
            ParseFailure::NoDataYet => write!(f, "no GPS data received yet"),
            ParseFailure::Overflow => write!(f, "GPS time does not fit a 32-bit seconds clock"),
        }
    }
}

impl std::error::Error for ParseFailure {}
