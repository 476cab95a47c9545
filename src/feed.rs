// src/feed.rs
//! NMEA line feed from a serial receiver or gpsd

use crate::{
    config::TimeSyncConfig,
    error::{Result, TimeSyncError},
    gps::{gpsd, nmea, Fix},
    host::{FixCallback, PositioningFeed, SentenceCallback},
};
use log::{debug, info};
use std::time::Duration;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    time::Instant,
};
use tokio_serial::SerialPortBuilderExt;

/// Where NMEA sentences come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Serial { port: String, baudrate: u32 },
    Gpsd { host: String, port: u16 },
}

impl FeedSource {
    pub fn from_config(config: &TimeSyncConfig) -> Result<Self> {
        match config.source_type.as_str() {
            "serial" => {
                let port = config
                    .serial_port
                    .clone()
                    .ok_or_else(|| TimeSyncError::Config("Serial source needs a serial_port".to_string()))?;
                Ok(FeedSource::Serial { port, baudrate: config.serial_baudrate.unwrap_or(9600) })
            }
            "gpsd" => Ok(FeedSource::Gpsd {
                host: config.gpsd_host.clone().unwrap_or_else(|| "localhost".to_string()),
                port: config.gpsd_port.unwrap_or(2947),
            }),
            other => Err(TimeSyncError::Config(format!("Unknown source type '{}'", other))),
        }
    }
}

/// Splits an NMEA line stream into raw-sentence and fix signals.
///
/// Every line goes to the sentence subscribers. Lines carrying a position
/// also produce a fix, at most one per `fix_interval`.
pub struct NmeaFeed {
    fix_interval: Duration,
    last_fix_at: Option<Instant>,
    fix_subscribers: Vec<FixCallback>,
    sentence_subscribers: Vec<SentenceCallback>,
}

impl NmeaFeed {
    pub fn new(fix_interval: Duration) -> Self {
        Self {
            fix_interval,
            last_fix_at: None,
            fix_subscribers: Vec::new(),
            sentence_subscribers: Vec::new(),
        }
    }

    /// Open `source` and pump it until it closes
    pub async fn run(&mut self, source: &FeedSource) -> Result<()> {
        match source {
            FeedSource::Serial { port, baudrate } => {
                info!("Connecting to GPS on {} at {} baud...", port, baudrate);

                let serial = tokio_serial::new(port, *baudrate)
                    .timeout(Duration::from_millis(1000))
                    .open_native_async()?;

                info!("Connected successfully!");
                self.pump(BufReader::new(serial)).await
            }
            FeedSource::Gpsd { host, port } => {
                info!("Connecting to gpsd at {}:{}...", host, port);

                let reader = gpsd::connect_gpsd(host, *port).await?;

                info!("Connected successfully!");
                self.pump(reader).await
            }
        }
    }

    /// Dispatch every line from `reader` until EOF
    pub async fn pump<R>(&mut self, mut reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("NMEA feed closed");
                    return Ok(());
                }
                Ok(_) => {
                    let sentence = line.trim();
                    if !sentence.is_empty() {
                        self.dispatch(sentence);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Hand one sentence to the subscribers
    pub fn dispatch(&mut self, sentence: &str) {
        for callback in self.sentence_subscribers.iter_mut() {
            callback(sentence);
        }

        if let Some(fix) = nmea::parse_position(sentence) {
            self.emit_fix(fix);
        }
    }

    fn emit_fix(&mut self, fix: Fix) {
        let now = Instant::now();
        if let Some(last) = self.last_fix_at {
            if now.duration_since(last) < self.fix_interval {
                return;
            }
        }
        self.last_fix_at = Some(now);

        for callback in self.fix_subscribers.iter_mut() {
            callback(fix);
        }
    }
}

impl PositioningFeed for NmeaFeed {
    fn subscribe_to_fixes(&mut self, callback: FixCallback) {
        self.fix_subscribers.push(callback);
    }

    fn subscribe_to_raw_sentences(&mut self, callback: SentenceCallback) {
        self.sentence_subscribers.push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const GSV: &str = "$GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75";

    fn recording(feed: &mut NmeaFeed) -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<Fix>>>) {
        let sentences = Arc::new(Mutex::new(Vec::new()));
        let fixes = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&sentences);
        feed.subscribe_to_raw_sentences(Box::new(move |s: &str| sink.lock().unwrap().push(s.to_string())));
        let sink = Arc::clone(&fixes);
        feed.subscribe_to_fixes(Box::new(move |f| sink.lock().unwrap().push(f)));

        (sentences, fixes)
    }

    #[tokio::test]
    async fn test_pump_forwards_every_line() {
        let mut feed = NmeaFeed::new(Duration::from_secs(10));
        let (sentences, fixes) = recording(&mut feed);

        let input = format!("{}\r\n\r\n{}\r\n", GSV, GGA);
        feed.pump(BufReader::new(input.as_bytes())).await.unwrap();

        assert_eq!(*sentences.lock().unwrap(), vec![GSV.to_string(), GGA.to_string()]);
        assert_eq!(fixes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixes_are_throttled() {
        let mut feed = NmeaFeed::new(Duration::from_secs(10));
        let (sentences, fixes) = recording(&mut feed);

        feed.dispatch(GGA);
        feed.dispatch(GGA);
        assert_eq!(fixes.lock().unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        feed.dispatch(GGA);

        assert_eq!(fixes.lock().unwrap().len(), 2);
        assert_eq!(sentences.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_source_from_config() {
        let mut config = TimeSyncConfig::default();
        assert_eq!(
            FeedSource::from_config(&config).unwrap(),
            FeedSource::Gpsd { host: "localhost".to_string(), port: 2947 }
        );

        config.source_type = "serial".to_string();
        assert!(matches!(FeedSource::from_config(&config), Err(TimeSyncError::Config(_))));

        config.update_serial("/dev/ttyACM0".to_string(), 4800);
        assert_eq!(
            FeedSource::from_config(&config).unwrap(),
            FeedSource::Serial { port: "/dev/ttyACM0".to_string(), baudrate: 4800 }
        );
    }
}
