// src/main.rs
//! GPS Time Sync - set the system clock and time zone from GPS

use clap::Parser;
use gps_timesync::{cli::Cli, config::TimeSyncConfig, service};
use log::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.list_ports {
        service::list_serial_ports()?;
        return Ok(());
    }

    // Load configuration
    let mut config = TimeSyncConfig::load().unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        TimeSyncConfig::default()
    });
    cli.apply_to(&mut config)?;

    if cli.save_config {
        config.save()?;
        info!("Configuration saved to {}", TimeSyncConfig::get_config_path()?.display());
    }

    info!("Starting GPS time sync using {} source", config.source_type);

    tokio::select! {
        result = service::run(config) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
