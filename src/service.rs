// src/service.rs
//! Service lifecycle: one fresh acquisition controller per start

use crate::{
    config::TimeSyncConfig,
    error::Result,
    feed::{FeedSource, NmeaFeed},
    host::{SystemHost, TokioScheduler},
    sync::{AcquisitionController, AcquisitionPhase},
};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Run the time sync service until the task is cancelled.
///
/// Each start builds a new host and controller. A start that finds
/// positioning disabled waits for the controller's retry and starts over;
/// a feed that ends or fails is retried after the same delay.
pub async fn run(config: TimeSyncConfig) -> Result<()> {
    let source = FeedSource::from_config(&config)?;

    loop {
        let (retry_tx, retry_rx) = oneshot::channel();
        let host = SystemHost::new(config.clone(), TokioScheduler::current());
        let controller = Arc::new(
            AcquisitionController::new(host, config.acquisition()).with_retry_action(move || {
                let _ = retry_tx.send(());
            }),
        );

        let mut feed = NmeaFeed::new(config.fix_interval());
        if controller.start(&mut feed) == AcquisitionPhase::Deferred {
            // The sender lives in the scheduled task; an error means it was dropped
            if retry_rx.await.is_err() {
                warn!("Retry was dropped, restarting now");
            }
            info!("Restarting GPS time acquisition");
            continue;
        }

        match feed.run(&source).await {
            Ok(()) => warn!("GPS feed closed"),
            Err(e) => error!("GPS feed failed: {}", e),
        }

        info!("Restarting GPS time acquisition in {}s", config.retry_delay_secs);
        tokio::time::sleep(config.retry_delay()).await;
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}
