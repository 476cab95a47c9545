// src/timezone.rs
//! Latitude/longitude to time zone lookup

use crate::host::{TimeZoneId, TimeZoneResolver};
use chrono_tz::Tz;

/// Resolves the nautical time zone for a position.
///
/// Zones are 15° of longitude wide and named after the IANA `Etc/GMT±N`
/// entries. Those names carry the POSIX sign, so a position east of
/// Greenwich gets a *minus*: Madrid's meridian zone is `Etc/GMT`, Moscow's
/// is `Etc/GMT-3`. Latitude does not take part.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongitudeResolver;

impl LongitudeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Whole-hour UTC offset of the nautical zone containing `longitude`
    pub fn offset_hours(longitude: f64) -> i32 {
        if !longitude.is_finite() {
            return 0;
        }
        let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
        (wrapped / 15.0).round() as i32
    }
}

impl TimeZoneResolver for LongitudeResolver {
    fn resolve_time_zone(&self, _latitude: f64, longitude: f64) -> TimeZoneId {
        let offset = Self::offset_hours(longitude);
        let name = match offset {
            0 => "Etc/GMT".to_string(),
            east if east > 0 => format!("Etc/GMT-{}", east),
            west => format!("Etc/GMT+{}", -west),
        };

        match name.parse::<Tz>() {
            Ok(tz) => TimeZoneId::new(tz.name()),
            Err(_) => {
                log::warn!("No time zone named {}, using UTC", name);
                TimeZoneId::new("Etc/UTC")
            }
        }
    }
}
