// src/gps/decoder.rs
//! UTC date/time extraction from GPRMC sentences

use super::buffer::GPRMC_ID;
use crate::error::{DateTimeField, ParseFailure};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use std::fmt;

/// Default anchor for two-digit GPRMC years
pub const DEFAULT_REFERENCE_YEAR: i32 = 2000;

// GPRMC field layout, see http://www.gpsinformation.org/dale/nmea.htm
const TIME_FIELD: usize = 1;
const DATE_FIELD: usize = 9;
const MIN_FIELDS: usize = 10;

/// A UTC instant decoded from GPS, or a snapshot of the local clock to compare it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecodedTime(DateTime<Utc>);

impl DecodedTime {
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Build from calendar fields; `None` if they do not name a real instant.
    pub fn from_calendar(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millis: u32,
    ) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
        Some(Self(Utc.from_utc_datetime(&date.and_time(time))))
    }

    pub fn epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    /// Sub-second part in nanoseconds
    pub fn nanosecond(&self) -> u32 {
        self.0.nanosecond()
    }
}

impl fmt::Display for DecodedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// Decode the UTC date and time carried by a GPRMC sentence.
///
/// Two-digit years land in the century window
/// `[reference_year - 50, reference_year + 50)`, so with the default anchor
/// of 2000 a `94` is 1994 and a `26` is 2026.
pub fn decode(sentence: &str, reference_year: i32) -> Result<DecodedTime, ParseFailure> {
    if !sentence.contains(GPRMC_ID) {
        return Err(ParseFailure::NotGprmc);
    }

    let parts: Vec<&str> = sentence.split(',').collect();
    if parts.len() < MIN_FIELDS {
        return Err(ParseFailure::TooFewFields { found: parts.len() });
    }

    let date = parse_date(strip_token(parts[DATE_FIELD]), reference_year)?;
    let time = parse_time(strip_token(parts[TIME_FIELD]))?;

    Ok(DecodedTime(Utc.from_utc_datetime(&date.and_time(time))))
}

/// Map a two-digit year into the 100-year window centred on `reference_year`.
pub fn expand_two_digit_year(yy: i32, reference_year: i32) -> i32 {
    let start = reference_year - 50;
    start + (yy - start).rem_euclid(100)
}

/// Drop a trailing `*hh` checksum and line ending
fn strip_token(token: &str) -> &str {
    token.split('*').next().unwrap_or(token).trim()
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Value of the two ASCII digits at `at`; caller has checked they are digits
fn pair(s: &str, at: usize) -> u32 {
    let b = s.as_bytes();
    u32::from(b[at] - b'0') * 10 + u32::from(b[at + 1] - b'0')
}

fn parse_time(token: &str) -> Result<NaiveTime, ParseFailure> {
    let malformed = || ParseFailure::MalformedDateTime {
        field: DateTimeField::Time,
        token: token.to_string(),
    };

    let (whole, fraction) = match token.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (token, None),
    };

    if whole.len() != 6 || !all_digits(whole) {
        return Err(malformed());
    }

    let nanos = match fraction {
        None => 0,
        Some(f) if f.len() <= 9 && all_digits(f) => {
            let digits: u32 = f.parse().map_err(|_| malformed())?;
            digits * 10u32.pow(9 - f.len() as u32)
        }
        Some(_) => return Err(malformed()),
    };

    // A leap second arrives as :60; chrono keeps it as :59 with the extra second in the nanos
    let (second, nanos) = match pair(whole, 4) {
        60 => (59, nanos + 1_000_000_000),
        second => (second, nanos),
    };

    NaiveTime::from_hms_nano_opt(pair(whole, 0), pair(whole, 2), second, nanos)
        .ok_or_else(malformed)
}

fn parse_date(token: &str, reference_year: i32) -> Result<NaiveDate, ParseFailure> {
    let malformed = || ParseFailure::MalformedDateTime {
        field: DateTimeField::Date,
        token: token.to_string(),
    };

    if token.len() != 6 || !all_digits(token) {
        return Err(malformed());
    }

    let year = expand_two_digit_year(pair(token, 4) as i32, reference_year);
    NaiveDate::from_ymd_opt(year, pair(token, 2), pair(token, 0)).ok_or_else(malformed)
}
