// src/cli.rs
//! Command line options layered over the config file

use crate::{
    config::{NetworkTimeMode, TimeSyncConfig},
    error::{Result, TimeSyncError},
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "gps-timesync", version, about = "Set the system clock and time zone from GPS")]
pub struct Cli {
    /// Read NMEA from this serial device instead of gpsd
    #[arg(long, value_name = "PORT")]
    pub serial: Option<String>,

    /// Serial baud rate
    #[arg(long, value_name = "BAUD")]
    pub baud: Option<u32>,

    /// Read NMEA from gpsd at HOST or HOST:PORT
    #[arg(long, value_name = "HOST[:PORT]", conflicts_with = "serial")]
    pub gpsd: Option<String>,

    /// Seconds to wait before retrying when GPS is unavailable
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<u64>,

    /// Minimum seconds between two clock decisions
    #[arg(long, value_name = "SECS")]
    pub fix_interval: Option<u64>,

    /// Anchor year for two-digit GPS years
    #[arg(long, value_name = "YEAR")]
    pub reference_year: Option<i32>,

    /// Do not set the clock
    #[arg(long)]
    pub no_auto_time: bool,

    /// Do not set the time zone
    #[arg(long)]
    pub no_auto_time_zone: bool,

    /// Network time source: enabled, disabled or detect
    #[arg(long, value_name = "MODE")]
    pub network_time: Option<NetworkTimeMode>,

    /// Log changes instead of applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Write the effective configuration to the config file
    #[arg(long)]
    pub save_config: bool,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

impl Cli {
    /// Override `config` with whatever was given on the command line
    pub fn apply_to(&self, config: &mut TimeSyncConfig) -> Result<()> {
        if let Some(port) = &self.serial {
            let baud = self.baud.or(config.serial_baudrate).unwrap_or(9600);
            config.update_serial(port.clone(), baud);
        } else if let Some(baud) = self.baud {
            config.serial_baudrate = Some(baud);
        }

        if let Some(gpsd) = &self.gpsd {
            let (host, port) = parse_gpsd_address(gpsd)?;
            config.update_gpsd(host, port);
        }

        if let Some(secs) = self.retry_delay {
            config.retry_delay_secs = secs;
        }
        if let Some(secs) = self.fix_interval {
            config.fix_interval_secs = secs;
        }
        if let Some(year) = self.reference_year {
            config.reference_year = year;
        }
        if let Some(mode) = self.network_time {
            config.network_time = mode;
        }

        config.auto_time &= !self.no_auto_time;
        config.auto_time_zone &= !self.no_auto_time_zone;
        config.dry_run |= self.dry_run;

        Ok(())
    }
}

fn parse_gpsd_address(address: &str) -> Result<(String, u16)> {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| TimeSyncError::Config(format!("Invalid gpsd port in '{}'", address)))?;
            Ok((host.to_string(), port))
        }
        None => Ok((address.to_string(), 2947)),
    }
}
