// src/host/system.rs
//! Host implementation backed by the running system

use super::{
    scheduler::run_blocking, HostSettings, Scheduler, SystemClock, TimeZoneId, TimeZoneResolver,
    TokioScheduler,
};
use crate::{
    config::{NetworkTimeMode, TimeSyncConfig},
    error::{Result, TimeSyncError},
    gps::gpsd,
    timezone::LongitudeResolver,
};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::{path::Path, process::Command, sync::Mutex, time::Duration};

const GPSD_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Reads its flags from the configuration, sets the realtime clock with
/// `clock_settime` and the zone through `timedatectl`.
pub struct SystemHost {
    config: TimeSyncConfig,
    resolver: LongitudeResolver,
    scheduler: TokioScheduler,
    applied_zone: Mutex<Option<TimeZoneId>>,
}

impl SystemHost {
    pub fn new(config: TimeSyncConfig, scheduler: TokioScheduler) -> Self {
        Self {
            config,
            resolver: LongitudeResolver::new(),
            scheduler,
            applied_zone: Mutex::new(None),
        }
    }
}

impl HostSettings for SystemHost {
    fn is_positioning_enabled(&self) -> bool {
        match self.config.source_type.as_str() {
            "serial" => match self.config.serial_port.as_deref() {
                Some(port) => Path::new(port).exists(),
                None => {
                    warn!("Serial source selected but no port configured");
                    false
                }
            },
            "gpsd" => {
                let host = self.config.gpsd_host.as_deref().unwrap_or("localhost");
                let port = self.config.gpsd_port.unwrap_or(2947);
                run_blocking(|| gpsd::is_reachable(host, port, GPSD_PROBE_TIMEOUT))
            }
            other => {
                warn!("Unknown source type '{}'", other);
                false
            }
        }
    }

    fn is_network_time_provider_enabled(&self) -> bool {
        match self.config.network_time {
            NetworkTimeMode::Enabled => true,
            NetworkTimeMode::Disabled => false,
            NetworkTimeMode::Detect => match run_blocking(ntp_synchronized) {
                Ok(synced) => synced,
                Err(e) => {
                    debug!("Cannot query network time state: {}", e);
                    false
                }
            },
        }
    }

    fn is_auto_time_enabled(&self) -> bool {
        self.config.auto_time
    }

    fn is_auto_time_zone_enabled(&self) -> bool {
        self.config.auto_time_zone
    }
}

impl TimeZoneResolver for SystemHost {
    fn resolve_time_zone(&self, latitude: f64, longitude: f64) -> TimeZoneId {
        self.resolver.resolve_time_zone(latitude, longitude)
    }
}

impl SystemClock for SystemHost {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn set_system_clock(&self, epoch_millis_utc: i64) {
        if self.config.dry_run {
            info!("Dry run: would set clock to {} ms since epoch", epoch_millis_utc);
            return;
        }

        if let Err(e) = set_realtime_clock(epoch_millis_utc) {
            error!("Failed to set system clock: {}", e);
        }
    }

    fn set_system_time_zone(&self, id: &TimeZoneId) {
        let mut applied = self.applied_zone.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if applied.as_ref() == Some(id) {
            return;
        }

        if self.config.dry_run {
            info!("Dry run: would set time zone to {}", id);
        } else if let Err(e) = run_blocking(|| set_time_zone(id)) {
            error!("Failed to set time zone: {}", e);
            return;
        }
        *applied = Some(id.clone());
    }
}

impl Scheduler for SystemHost {
    fn schedule_one_shot(&self, delay: Duration, action: Box<dyn FnOnce() + Send>) {
        self.scheduler.schedule_one_shot(delay, action);
    }
}

/// Whether systemd-timesyncd reports the clock as network synchronized
fn ntp_synchronized() -> Result<bool> {
    let output = Command::new("timedatectl")
        .args(["show", "--property=NTPSynchronized", "--value"])
        .output()?;

    if !output.status.success() {
        return Err(TimeSyncError::Other(format!("timedatectl exited with {}", output.status)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim() == "yes")
}

fn set_time_zone(id: &TimeZoneId) -> Result<()> {
    let status = Command::new("timedatectl")
        .args(["set-timezone", id.as_str()])
        .status()?;

    if !status.success() {
        return Err(TimeSyncError::Clock(format!("timedatectl set-timezone {} exited with {}", id, status)));
    }
    Ok(())
}

#[cfg(unix)]
fn set_realtime_clock(epoch_millis_utc: i64) -> Result<()> {
    let ts = libc::timespec {
        tv_sec: epoch_millis_utc.div_euclid(1000) as _,
        tv_nsec: (epoch_millis_utc.rem_euclid(1000) * 1_000_000) as _,
    };

    // SAFETY: `ts` is a fully initialised timespec that outlives the call.
    let rc = unsafe { libc::clock_settime(libc::CLOCK_REALTIME, &ts) };
    if rc != 0 {
        return Err(TimeSyncError::Clock(format!(
            "clock_settime failed: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_realtime_clock(_epoch_millis_utc: i64) -> Result<()> {
    Err(TimeSyncError::Clock("Setting the clock is only supported on Unix".to_string()))
}
