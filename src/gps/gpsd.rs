// src/gps/gpsd.rs
//! GPSD client: raw NMEA passthrough

use crate::error::{Result, TimeSyncError};
use serde::Serialize;
use std::{
    net::{TcpStream as StdTcpStream, ToSocketAddrs},
    time::Duration,
};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::TcpStream,
};

#[derive(Debug, Serialize)]
struct WatchRequest {
    enable: bool,
    nmea: bool,
}

/// Build the `?WATCH` command asking gpsd to relay raw NMEA sentences
fn watch_command() -> Result<String> {
    let request = serde_json::to_string(&WatchRequest { enable: true, nmea: true })?;
    Ok(format!("?WATCH={}\n", request))
}

/// Connect to a gpsd daemon and return a reader yielding NMEA lines
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| TimeSyncError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    stream
        .write_all(watch_command()?.as_bytes())
        .await
        .map_err(|e| TimeSyncError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Check whether gpsd accepts connections, without starting a session
pub fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            log::debug!("Cannot resolve gpsd host {}: {}", host, e);
            return false;
        }
    };

    addrs
        .into_iter()
        .any(|addr| StdTcpStream::connect_timeout(&addr, timeout).is_ok())
}
