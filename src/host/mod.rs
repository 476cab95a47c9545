// src/host/mod.rs
//! Collaborators the acquisition core relies on.
//!
//! The core never talks to the operating system directly. Everything it
//! needs from the outside world goes through these traits, so the same
//! controller runs against the real system (`system::SystemHost`) or against
//! recording fakes in tests.

pub mod scheduler;
pub mod system;

use crate::gps::Fix;
use chrono::{DateTime, Utc};
use std::{fmt, time::Duration};

pub use scheduler::TokioScheduler;
pub use system::SystemHost;

/// Callback invoked for every positioning fix
pub type FixCallback = Box<dyn FnMut(Fix) + Send>;

/// Callback invoked for every raw NMEA sentence
pub type SentenceCallback = Box<dyn FnMut(&str) + Send>;

/// IANA time zone name, e.g. `Europe/Madrid` or `Etc/GMT+3`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeZoneId(String);

impl TimeZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host flags read on every decision
pub trait HostSettings {
    fn is_positioning_enabled(&self) -> bool;
    fn is_network_time_provider_enabled(&self) -> bool;
    fn is_auto_time_enabled(&self) -> bool;
    fn is_auto_time_zone_enabled(&self) -> bool;
}

/// Source of positioning fixes and raw NMEA sentences
pub trait PositioningFeed {
    fn subscribe_to_fixes(&mut self, callback: FixCallback);
    fn subscribe_to_raw_sentences(&mut self, callback: SentenceCallback);
}

pub trait TimeZoneResolver {
    fn resolve_time_zone(&self, latitude: f64, longitude: f64) -> TimeZoneId;
}

/// Wall clock access. Setters are fire-and-forget: failures are the
/// implementation's to log, the caller carries on regardless.
pub trait SystemClock {
    fn now(&self) -> DateTime<Utc>;
    fn set_system_clock(&self, epoch_millis_utc: i64);
    fn set_system_time_zone(&self, id: &TimeZoneId);
}

pub trait Scheduler {
    fn schedule_one_shot(&self, delay: Duration, action: Box<dyn FnOnce() + Send>);
}

/// Everything the acquisition controller needs from its environment
pub trait Host: HostSettings + TimeZoneResolver + SystemClock + Scheduler {}

impl<T> Host for T where T: HostSettings + TimeZoneResolver + SystemClock + Scheduler {}
