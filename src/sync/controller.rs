// src/sync/controller.rs
//! Acquisition state machine tying the feed, decoder and reconciler together

use super::reconciler::{reconcile, ReconciliationDecision};
use crate::{
    error::ParseFailure,
    gps::{decoder, DecodedTime, Fix, NmeaSentenceBuffer},
    host::{Host, PositioningFeed},
};
use log::{debug, info, warn};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

/// Delay before retrying when positioning is switched off
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPhase {
    Idle,
    AwaitingFix,
    Deciding,
    Applied,
    Skipped,
    Deferred,
}

#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub retry_delay: Duration,
    pub reference_year: i32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            reference_year: decoder::DEFAULT_REFERENCE_YEAR,
        }
    }
}

/// Work to run when the positioning retry fires
pub type RetryAction = Box<dyn FnOnce() + Send>;

struct AcquisitionState {
    phase: AcquisitionPhase,
    started: bool,
    retry_pending: bool,
    retry_action: Option<RetryAction>,
    last_decision: Option<ReconciliationDecision>,
}

/// Drives one acquisition run.
///
/// A controller is built fresh for every service start and started once.
/// When positioning is off it schedules a single retry and stays `Deferred`;
/// the retry is expected to tear it down and build a new one.
pub struct AcquisitionController<H: Host> {
    host: H,
    config: AcquisitionConfig,
    buffer: Arc<NmeaSentenceBuffer>,
    state: Mutex<AcquisitionState>,
}

impl<H: Host> AcquisitionController<H> {
    pub fn new(host: H, config: AcquisitionConfig) -> Self {
        Self {
            host,
            config,
            buffer: Arc::new(NmeaSentenceBuffer::new()),
            state: Mutex::new(AcquisitionState {
                phase: AcquisitionPhase::Idle,
                started: false,
                retry_pending: false,
                retry_action: None,
                last_decision: None,
            }),
        }
    }

    /// Run `action` when the positioning retry fires, typically a service restart
    pub fn with_retry_action(self, action: impl FnOnce() + Send + 'static) -> Self {
        self.lock_state().retry_action = Some(Box::new(action));
        self
    }

    pub fn phase(&self) -> AcquisitionPhase {
        self.lock_state().phase
    }

    pub fn retry_pending(&self) -> bool {
        self.lock_state().retry_pending
    }

    pub fn last_decision(&self) -> Option<ReconciliationDecision> {
        self.lock_state().last_decision.clone()
    }

    pub fn buffer(&self) -> &Arc<NmeaSentenceBuffer> {
        &self.buffer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Start the run: subscribe to the feed, or defer and schedule a retry.
    ///
    /// Only the first call has any effect.
    pub fn start<F>(self: &Arc<Self>, feed: &mut F) -> AcquisitionPhase
    where
        F: PositioningFeed,
        H: Send + Sync + 'static,
    {
        {
            let mut state = self.lock_state();
            if state.started {
                debug!("Acquisition already started");
                return state.phase;
            }
            state.started = true;
        }

        // The state lock is never held across host or feed calls, which may
        // run the retry action or a callback inline.
        if !self.host.is_positioning_enabled() {
            info!(
                "GPS is disabled, checking again in {}s",
                self.config.retry_delay.as_secs()
            );
            let action: RetryAction = {
                let mut state = self.lock_state();
                state.phase = AcquisitionPhase::Deferred;
                state.retry_pending = true;
                match state.retry_action.take() {
                    Some(action) => action,
                    None => Box::new(|| debug!("Acquisition retry due")),
                }
            };
            self.host.schedule_one_shot(self.config.retry_delay, action);
            return AcquisitionPhase::Deferred;
        }

        info!("GPS is enabled, waiting for fixes");
        self.lock_state().phase = AcquisitionPhase::AwaitingFix;

        let buffer = Arc::clone(&self.buffer);
        feed.subscribe_to_raw_sentences(Box::new(move |sentence: &str| {
            buffer.observe(sentence);
        }));

        let controller = Arc::clone(self);
        feed.subscribe_to_fixes(Box::new(move |fix| {
            controller.handle_fix(fix);
        }));

        AcquisitionPhase::AwaitingFix
    }

    /// Process one fix to completion.
    ///
    /// Returns the reconciliation decision, or `None` when time decoding was
    /// not attempted (network time in charge, or not awaiting a fix).
    pub fn handle_fix(&self, fix: Fix) -> Option<ReconciliationDecision> {
        let mut state = self.lock_state();
        if state.phase != AcquisitionPhase::AwaitingFix {
            debug!("Ignoring fix while {:?}", state.phase);
            return None;
        }

        if self.host.is_auto_time_zone_enabled() {
            let zone = self.host.resolve_time_zone(fix.latitude, fix.longitude);
            info!(
                "New time zone: {} for latitude {} and longitude {}",
                zone, fix.latitude, fix.longitude
            );
            self.host.set_system_time_zone(&zone);
        } else {
            debug!("Auto time zone is disabled");
        }

        if self.host.is_network_time_provider_enabled() {
            debug!("Using network time provider");
            return None;
        }

        state.phase = AcquisitionPhase::Deciding;
        let decision = self.decide();

        state.phase = match &decision {
            ReconciliationDecision::Apply(epoch_millis) => {
                self.host.set_system_clock(*epoch_millis);
                info!("Date & time updated from GPS");
                AcquisitionPhase::Applied
            }
            ReconciliationDecision::SkipAlreadyAligned => {
                debug!("System clock already aligned with GPS");
                AcquisitionPhase::Skipped
            }
            ReconciliationDecision::DeferNoData => AcquisitionPhase::Deferred,
            ReconciliationDecision::DeferParseError(reason) => {
                warn!("Cannot use GPS time: {}", reason);
                AcquisitionPhase::Deferred
            }
        };
        debug!("Fix handled: {:?}", state.phase);

        state.last_decision = Some(decision.clone());
        state.phase = AcquisitionPhase::AwaitingFix;
        Some(decision)
    }

    fn decide(&self) -> ReconciliationDecision {
        if !self.host.is_auto_time_enabled() {
            debug!("Auto time is disabled");
            return ReconciliationDecision::DeferNoData;
        }

        let sentence = match self.buffer.latest() {
            Some(sentence) => sentence,
            None => {
                debug!("{}", ParseFailure::NoDataYet);
                return ReconciliationDecision::DeferNoData;
            }
        };
        debug!("{}", sentence);

        match decoder::decode(&sentence, self.config.reference_year) {
            Ok(gps_time) => {
                debug!("GPS UTC time: {}", gps_time);
                let local_now = DecodedTime::from_utc(self.host.now());
                reconcile(Some(&gps_time), &local_now)
            }
            Err(reason) => ReconciliationDecision::DeferParseError(reason),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, AcquisitionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{
        FixCallback, HostSettings, Scheduler, SentenceCallback, SystemClock, TimeZoneId,
        TimeZoneResolver,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Weak;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    #[derive(Default)]
    struct Calls {
        clock: Vec<i64>,
        zones: Vec<TimeZoneId>,
        resolved: Vec<(f64, f64)>,
        scheduled: Vec<Duration>,
    }

    struct FakeHost {
        positioning: bool,
        network_time: bool,
        auto_time: bool,
        auto_time_zone: bool,
        now: DateTime<Utc>,
        calls: Mutex<Calls>,
    }

    impl FakeHost {
        fn new() -> Self {
            Self {
                positioning: true,
                network_time: false,
                auto_time: true,
                auto_time_zone: false,
                now: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
                calls: Mutex::new(Calls::default()),
            }
        }

        fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
            self.calls.lock().unwrap()
        }
    }

    impl HostSettings for FakeHost {
        fn is_positioning_enabled(&self) -> bool {
            self.positioning
        }
        fn is_network_time_provider_enabled(&self) -> bool {
            self.network_time
        }
        fn is_auto_time_enabled(&self) -> bool {
            self.auto_time
        }
        fn is_auto_time_zone_enabled(&self) -> bool {
            self.auto_time_zone
        }
    }

    impl TimeZoneResolver for FakeHost {
        fn resolve_time_zone(&self, latitude: f64, longitude: f64) -> TimeZoneId {
            self.calls().resolved.push((latitude, longitude));
            TimeZoneId::new("Europe/Madrid")
        }
    }

    impl SystemClock for FakeHost {
        fn now(&self) -> DateTime<Utc> {
            self.now
        }
        fn set_system_clock(&self, epoch_millis_utc: i64) {
            self.calls().clock.push(epoch_millis_utc);
        }
        fn set_system_time_zone(&self, id: &TimeZoneId) {
            self.calls().zones.push(id.clone());
        }
    }

    impl Scheduler for FakeHost {
        fn schedule_one_shot(&self, delay: Duration, action: Box<dyn FnOnce() + Send>) {
            self.calls().scheduled.push(delay);
            action();
        }
    }

    #[derive(Default)]
    struct FakeFeed {
        fixes: Vec<FixCallback>,
        sentences: Vec<SentenceCallback>,
    }

    impl PositioningFeed for FakeFeed {
        fn subscribe_to_fixes(&mut self, callback: FixCallback) {
            self.fixes.push(callback);
        }
        fn subscribe_to_raw_sentences(&mut self, callback: SentenceCallback) {
            self.sentences.push(callback);
        }
    }

    impl FakeFeed {
        fn sentence(&mut self, line: &str) {
            for cb in self.sentences.iter_mut() {
                cb(line);
            }
        }
        fn fix(&mut self, fix: Fix) {
            for cb in self.fixes.iter_mut() {
                cb(fix);
            }
        }
    }

    fn started(host: FakeHost) -> (Arc<AcquisitionController<FakeHost>>, FakeFeed) {
        let controller = Arc::new(AcquisitionController::new(host, AcquisitionConfig::default()));
        let mut feed = FakeFeed::default();
        assert_eq!(controller.start(&mut feed), AcquisitionPhase::AwaitingFix);
        (controller, feed)
    }

    #[test]
    fn test_applies_gps_time() {
        let (controller, mut feed) = started(FakeHost::new());

        feed.sentence(RMC);
        feed.fix(Fix::new(48.1, 11.5));

        assert_eq!(controller.last_decision(), Some(ReconciliationDecision::Apply(764_426_119_000)));
        assert_eq!(controller.host().calls().clock, vec![764_426_119_000]);
        assert_eq!(controller.phase(), AcquisitionPhase::AwaitingFix);
    }

    #[test]
    fn test_positioning_disabled_schedules_one_retry() {
        let host = FakeHost { positioning: false, auto_time_zone: true, ..FakeHost::new() };
        let config = AcquisitionConfig { retry_delay: Duration::from_secs(7), ..Default::default() };
        let retries = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&retries);
        let controller = Arc::new(
            AcquisitionController::new(host, config)
                .with_retry_action(move || *counter.lock().unwrap() += 1),
        );
        let mut feed = FakeFeed::default();

        assert_eq!(controller.start(&mut feed), AcquisitionPhase::Deferred);
        // A second start is a no-op
        assert_eq!(controller.start(&mut feed), AcquisitionPhase::Deferred);

        assert!(controller.retry_pending());
        assert_eq!(*retries.lock().unwrap(), 1);
        assert!(feed.fixes.is_empty() && feed.sentences.is_empty());
        assert_eq!(controller.handle_fix(Fix::new(40.0, -3.0)), None);

        let calls = controller.host().calls();
        assert_eq!(calls.scheduled, vec![Duration::from_secs(7)]);
        assert!(calls.clock.is_empty());
        assert!(calls.zones.is_empty());
    }

    #[test]
    fn test_retry_action_can_read_controller() {
        let host = FakeHost { positioning: false, ..FakeHost::new() };
        let slot: Arc<Mutex<Option<Weak<AcquisitionController<FakeHost>>>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(None));

        let (target, sink) = (Arc::clone(&slot), Arc::clone(&seen));
        let controller = Arc::new(AcquisitionController::new(host, AcquisitionConfig::default()).with_retry_action(
            move || {
                let controller = target.lock().unwrap().as_ref().and_then(Weak::upgrade);
                if let Some(controller) = controller {
                    *sink.lock().unwrap() = Some((controller.phase(), controller.retry_pending()));
                }
            },
        ));
        *slot.lock().unwrap() = Some(Arc::downgrade(&controller));

        // The fake scheduler runs the action inline, inside start()
        assert_eq!(controller.start(&mut FakeFeed::default()), AcquisitionPhase::Deferred);
        assert_eq!(*seen.lock().unwrap(), Some((AcquisitionPhase::Deferred, true)));
    }

    #[test]
    fn test_too_few_fields_keeps_waiting() {
        let (controller, mut feed) = started(FakeHost::new());

        feed.sentence("$GPRMC,123519,A,4807.038,N,01131.000");
        let decision = controller.handle_fix(Fix::new(48.1, 11.5));

        assert_eq!(
            decision,
            Some(ReconciliationDecision::DeferParseError(ParseFailure::TooFewFields { found: 6 }))
        );
        assert_eq!(controller.phase(), AcquisitionPhase::AwaitingFix);
        assert!(controller.host().calls().clock.is_empty());
    }

    #[test]
    fn test_network_time_skips_decoding() {
        let host = FakeHost { network_time: true, ..FakeHost::new() };
        let (controller, mut feed) = started(host);

        feed.sentence(RMC);
        assert_eq!(controller.handle_fix(Fix::new(48.1, 11.5)), None);

        assert!(controller.last_decision().is_none());
        assert!(controller.host().calls().clock.is_empty());
        assert_eq!(controller.phase(), AcquisitionPhase::AwaitingFix);
    }

    #[test]
    fn test_time_zone_follows_fix() {
        let host = FakeHost { auto_time_zone: true, network_time: true, ..FakeHost::new() };
        let (controller, mut feed) = started(host);

        feed.fix(Fix::new(40.0, -3.0));

        let calls = controller.host().calls();
        assert_eq!(calls.resolved, vec![(40.0, -3.0)]);
        assert_eq!(calls.zones, vec![TimeZoneId::new("Europe/Madrid")]);
    }

    #[test]
    fn test_time_zone_set_on_every_fix() {
        let host = FakeHost { auto_time_zone: true, ..FakeHost::new() };
        let (controller, mut feed) = started(host);

        feed.fix(Fix::new(40.0, -3.0));
        feed.sentence(RMC);
        feed.fix(Fix::new(40.0, -3.0));

        let calls = controller.host().calls();
        assert_eq!(calls.zones.len(), 2);
        assert_eq!(calls.clock.len(), 1);
    }

    #[test]
    fn test_no_data_yet() {
        let (controller, mut feed) = started(FakeHost::new());

        feed.fix(Fix::new(48.1, 11.5));

        assert_eq!(controller.last_decision(), Some(ReconciliationDecision::DeferNoData));
        assert!(controller.host().calls().clock.is_empty());
    }

    #[test]
    fn test_auto_time_disabled() {
        let host = FakeHost { auto_time: false, ..FakeHost::new() };
        let (controller, mut feed) = started(host);

        feed.sentence(RMC);
        feed.fix(Fix::new(48.1, 11.5));

        assert_eq!(controller.last_decision(), Some(ReconciliationDecision::DeferNoData));
        assert!(controller.host().calls().clock.is_empty());
    }

    #[test]
    fn test_aligned_clock_not_touched() {
        let host = FakeHost {
            now: Utc.with_ymd_and_hms(1994, 3, 23, 12, 35, 19).unwrap(),
            ..FakeHost::new()
        };
        let (controller, mut feed) = started(host);

        feed.sentence(RMC);
        feed.fix(Fix::new(48.1, 11.5));

        assert_eq!(controller.last_decision(), Some(ReconciliationDecision::SkipAlreadyAligned));
        assert!(controller.host().calls().clock.is_empty());
    }

    #[test]
    fn test_ignores_non_rmc_sentences() {
        let (controller, mut feed) = started(FakeHost::new());

        feed.sentence(RMC);
        feed.sentence("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");

        assert_eq!(controller.buffer().latest().as_deref(), Some(RMC));
    }
}
