// src/lib.rs
//! GPS Time Sync Library
//!
//! Keeps the system clock and time zone aligned with GPS when no network
//! time source is available. The core (`gps`, `sync`) is platform-free and
//! talks to the outside world through the traits in `host`.

pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod gps;
pub mod host;
pub mod service;
pub mod sync;
pub mod timezone;

// Re-export main types for convenience
pub use error::{ParseFailure, Result, TimeSyncError};
pub use gps::{decode, DecodedTime, Fix, NmeaSentenceBuffer};
pub use sync::{reconcile, AcquisitionController, AcquisitionPhase, ReconciliationDecision};
