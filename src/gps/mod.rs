// src/gps/mod.rs
//! NMEA handling: sentence buffering, time decoding, position extraction

pub mod buffer;
pub mod decoder;
pub mod gpsd;
pub mod nmea;

pub use buffer::NmeaSentenceBuffer;
pub use decoder::{decode, DecodedTime};
pub use nmea::Fix;
