// src/sync/reconciler.rs
//! Decide whether a GPS time should be pushed to the system clock

use crate::{error::ParseFailure, gps::DecodedTime};

/// Outcome of one acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationDecision {
    /// Set the clock to this many milliseconds since the Unix epoch
    Apply(i64),
    SkipAlreadyAligned,
    DeferNoData,
    DeferParseError(ParseFailure),
}

/// Compare a decoded GPS time with a snapshot of the local clock.
///
/// Only the second of the minute is compared, sub-second parts are ignored.
/// A GPS time that differs from the local clock in date, hour or minute but
/// agrees on the second is therefore reported as aligned.
pub fn reconcile(decoded: Option<&DecodedTime>, local_now: &DecodedTime) -> ReconciliationDecision {
    let decoded = match decoded {
        Some(decoded) => decoded,
        None => return ReconciliationDecision::DeferNoData,
    };

    // Clock-setting APIs with 32-bit seconds cannot take anything past 2038
    if decoded.epoch_seconds() > i64::from(i32::MAX) {
        return ReconciliationDecision::DeferParseError(ParseFailure::Overflow);
    }

    if decoded.second() == local_now.second() {
        return ReconciliationDecision::SkipAlreadyAligned;
    }

    ReconciliationDecision::Apply(decoded.epoch_millis())
}
