// src/gps/buffer.rs
//! Single-slot cache of the latest GPRMC sentence

use std::sync::{Arc, RwLock};

/// Identifier used to pick GPRMC sentences out of a mixed NMEA stream
pub const GPRMC_ID: &str = "GPRMC";

/// Holds the most recent GPRMC sentence seen on the feed.
///
/// The feed callback writes and the acquisition controller reads, usually
/// from different threads. The lock only guards an `Arc` swap, so neither
/// side waits on the other for longer than a pointer copy and a reader never
/// sees half a sentence.
#[derive(Debug, Default)]
pub struct NmeaSentenceBuffer {
    slot: RwLock<Option<Arc<str>>>,
}

impl NmeaSentenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `sentence` if it is a GPRMC sentence. Returns true when the slot was replaced.
    pub fn observe(&self, sentence: &str) -> bool {
        if !sentence.contains(GPRMC_ID) {
            return false;
        }

        let sentence: Arc<str> = Arc::from(sentence);
        let mut slot = self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(sentence);
        true
    }

    /// Latest GPRMC sentence, if any. Does not clear the slot.
    pub fn latest(&self) -> Option<Arc<str>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    #[test]
    fn test_empty_buffer() {
        let buffer = NmeaSentenceBuffer::new();
        assert!(buffer.latest().is_none());
    }

    #[test]
    fn test_ignores_other_sentences() {
        let buffer = NmeaSentenceBuffer::new();
        assert!(buffer.observe(RMC));

        let gga = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
        assert!(!buffer.observe(gga));
        assert_eq!(buffer.latest().as_deref(), Some(RMC));
    }

    #[test]
    fn test_last_write_wins() {
        let buffer = NmeaSentenceBuffer::new();
        let newer = "$GPRMC,123520,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*63";

        buffer.observe(RMC);
        buffer.observe(newer);

        assert_eq!(buffer.latest().as_deref(), Some(newer));
        // Reading does not consume
        assert_eq!(buffer.latest().as_deref(), Some(newer));
    }

    #[test]
    fn test_concurrent_reader_sees_whole_sentences() {
        let buffer = Arc::new(NmeaSentenceBuffer::new());
        let sentences: Vec<String> = (0..200)
            .map(|i| format!("$GPRMC,12{:04},A,,,,,,,230394,,*00", i))
            .collect();

        let writer = {
            let buffer = Arc::clone(&buffer);
            let sentences = sentences.clone();
            thread::spawn(move || {
                for s in &sentences {
                    buffer.observe(s);
                }
            })
        };

        for _ in 0..500 {
            if let Some(seen) = buffer.latest() {
                assert!(sentences.iter().any(|s| s.as_str() == &*seen));
            }
        }

        writer.join().unwrap();
        assert_eq!(buffer.latest().as_deref(), sentences.last().map(|s| s.as_str()));
    }
}
