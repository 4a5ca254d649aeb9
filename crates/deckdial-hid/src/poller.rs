//! The polling loop that keeps the interface claimed and feeds gestures out.

use std::time::Duration;

use deckdial_core::{GestureSink, HexBytes, ResilienceState, SignatureTable};
use tracing::{debug, error, info, trace, warn};

use crate::backoff::Backoff;
use crate::device::{DeviceHandle, UsbBackend};
use crate::reader::{ReadOutcome, ReportReader};
use crate::shutdown::Shutdown;

/// Timing knobs for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Upper bound on a single interrupt read
    pub read_timeout: Duration,
    /// Optional wait after each connected iteration
    pub pace: Duration,
    pub backoff: Backoff,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { read_timeout: Duration::from_millis(200), pace: Duration::ZERO, backoff: Backoff::default() }
    }
}

/// Counters collected over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub reports: u64,
    pub gestures: u64,
    pub transient_errors: u64,
    pub reconnects: u64,
    pub dispatch_failures: u64,
}

/// Reads reports, classifies them, and hands gestures to a sink until told to
/// stop, re-claiming the interface whenever the device goes away.
pub struct ResilienceLoop<B: UsbBackend, S: GestureSink> {
    handle: DeviceHandle<B>,
    reader: ReportReader,
    signatures: SignatureTable,
    sink: S,
    config: PollConfig,
    shutdown: Shutdown,
    state: ResilienceState,
    stats: LoopStats,
}

impl<B: UsbBackend, S: GestureSink> ResilienceLoop<B, S> {
    /// Start from an already claimed handle, in the `Connected` state.
    pub fn new(
        handle: DeviceHandle<B>,
        signatures: SignatureTable,
        sink: S,
        config: PollConfig,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            handle,
            reader: ReportReader::new(),
            signatures,
            sink,
            config,
            shutdown,
            state: ResilienceState::Connected,
            stats: LoopStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ResilienceState {
        self.state
    }

    /// Run until shutdown is requested. The interface is released before
    /// returning, whatever state the loop was in.
    pub fn run(mut self) -> LoopStats {
        info!(
            device = %self.handle.id(),
            signatures = self.signatures.len(),
            mode = ?self.signatures.mode(),
            "Listening for reports"
        );

        while !self.shutdown.is_triggered() {
            self.stats.iterations += 1;
            match self.state {
                ResilienceState::Connected => self.poll_once(),
                ResilienceState::Reconnecting { attempt, .. } => self.try_reconnect(attempt),
            }
        }

        self.handle.release();
        info!(
            iterations = self.stats.iterations,
            gestures = self.stats.gestures,
            reconnects = self.stats.reconnects,
            "Polling stopped"
        );
        self.stats
    }

    fn poll_once(&mut self) {
        let endpoint = self.handle.id().endpoint;

        let gone = match self.reader.read(&self.handle, endpoint, self.config.read_timeout) {
            ReadOutcome::Data(report) => {
                self.stats.reports += 1;
                trace!(len = report.len(), report = %HexBytes(report), "Report");

                if let Some(gesture) = self.signatures.classify(report) {
                    self.stats.gestures += 1;
                    debug!(%gesture, "Gesture");
                    if let Err(e) = self.sink.dispatch(gesture) {
                        self.stats.dispatch_failures += 1;
                        warn!(%gesture, error = %e, "Gesture dispatch failed");
                    }
                }
                None
            }
            ReadOutcome::Timeout => None,
            ReadOutcome::TransientError(e) => {
                self.stats.transient_errors += 1;
                debug!(error = %e, "Transient transfer error");
                None
            }
            ReadOutcome::DeviceGone(e) => Some(e),
        };

        if let Some(e) = gone {
            warn!(error = %e, "Interface went away, reconnecting");
            self.enter(ResilienceState::Reconnecting { attempt: 0, persistent: false });
            return;
        }

        self.shutdown.wait_timeout(self.config.pace);
    }

    fn try_reconnect(&mut self, attempt: u32) {
        if self.shutdown.wait_timeout(self.config.backoff.delay(attempt)) {
            return;
        }

        match self.handle.reopen() {
            Ok(()) => {
                self.stats.reconnects += 1;
                info!(attempts = attempt + 1, "Device reconnected");
                self.enter(ResilienceState::Connected);
            }
            Err(e) => {
                let failed = attempt.saturating_add(1);
                let persistent = self.config.backoff.is_exhausted(failed);

                if persistent && !self.state.is_persistent_failure() {
                    error!(
                        attempts = failed,
                        error = %e,
                        "Device still unavailable, retrying every {:?}",
                        self.config.backoff.max
                    );
                } else {
                    debug!(attempt = failed, error = %e, "Reconnect failed");
                }

                self.enter(ResilienceState::Reconnecting { attempt: failed, persistent });
            }
        }
    }

    fn enter(&mut self, next: ResilienceState) {
        let changed = self.state.differs_in_phase(&next);
        self.state = next;
        if changed {
            self.sink.link_state(&next);
        }
    }
}

#[cfg(test)]
mod tests {
    use deckdial_core::{DispatchError, Gesture, Direction, MatchMode};
    use mockall::mock;
    use mockall::predicate::eq;
    use parking_lot::Mutex;
    use std::sync::Arc;

    use super::*;
    use crate::device::DeviceId;
    use crate::testing::ScriptedBackend;

    const KNOB_REPORT: &[u8] = &[0x01, 0x03, 0x05, 0x00, 0x01, 0x01, 0x00, 0x00];
    const BUTTON_REPORT: &[u8] = &[0x01, 0x00, 0x08, 0x00, 0x01, 0x00, 0x00];
    const KNOB_UP: Gesture = Gesture::KnobTurn { knob: 1, direction: Direction::Up };
    const BUTTON: Gesture = Gesture::ButtonPress { button: 1 };

    mock! {
        Sink {}

        impl GestureSink for Sink {
            fn dispatch(&self, gesture: Gesture) -> Result<(), DispatchError>;
            fn link_state(&self, state: &ResilienceState);
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Seen {
        Gesture(Gesture),
        Link(ResilienceState),
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl RecordingSink {
        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().clone()
        }
    }

    impl GestureSink for RecordingSink {
        fn dispatch(&self, gesture: Gesture) -> Result<(), DispatchError> {
            self.seen.lock().push(Seen::Gesture(gesture));
            Ok(())
        }

        fn link_state(&self, state: &ResilienceState) {
            self.seen.lock().push(Seen::Link(*state));
        }
    }

    fn fast_config() -> PollConfig {
        PollConfig {
            read_timeout: Duration::from_millis(1),
            pace: Duration::ZERO,
            backoff: Backoff { initial: Duration::from_millis(1), max: Duration::from_millis(2), ceiling: 3 },
        }
    }

    fn build<S: GestureSink>(backend: &ScriptedBackend, sink: S) -> ResilienceLoop<ScriptedBackend, S> {
        let shutdown = Shutdown::new();
        backend.stop_when_drained(shutdown.clone());
        let handle = DeviceHandle::open_and_claim(backend.clone(), DeviceId::default()).unwrap();
        ResilienceLoop::new(handle, SignatureTable::builtin(MatchMode::Prefix), sink, fast_config(), shutdown)
    }

    #[test]
    fn test_dispatches_gestures_in_arrival_order() {
        let backend = ScriptedBackend::new();
        backend.push_report(BUTTON_REPORT);
        backend.push_report(&[0xff, 0xff, 0xff]);
        backend.push_report(KNOB_REPORT);
        backend.push_report(KNOB_REPORT);

        let sink = RecordingSink::default();
        let stats = build(&backend, sink.clone()).run();

        assert_eq!(
            sink.seen(),
            vec![Seen::Gesture(BUTTON), Seen::Gesture(KNOB_UP), Seen::Gesture(KNOB_UP)]
        );
        assert_eq!(stats.reports, 4);
        assert_eq!(stats.gestures, 3);
    }

    #[test]
    fn test_recovers_after_device_gone() {
        let backend = ScriptedBackend::new();
        // Iteration 1: knob. Iteration 2: gone. Iteration 3: reopen. Iteration 4: button.
        backend.push_report(KNOB_REPORT);
        backend.push_error(rusb::Error::NoDevice);
        backend.push_report(BUTTON_REPORT);

        let sink = RecordingSink::default();
        let stats = build(&backend, sink.clone()).run();

        assert_eq!(
            sink.seen(),
            vec![
                Seen::Gesture(KNOB_UP),
                Seen::Link(ResilienceState::Reconnecting { attempt: 0, persistent: false }),
                Seen::Link(ResilienceState::Connected),
                Seen::Gesture(BUTTON),
            ]
        );
        assert_eq!(stats.reconnects, 1);
        assert_eq!(backend.opens(), 2);
        assert_eq!(backend.max_live_claims(), 1);
        assert_eq!(backend.live_claims(), 0);
    }

    #[test]
    fn test_no_reads_while_reconnecting() {
        let backend = ScriptedBackend::new();
        backend.push_error(rusb::Error::NotFound);
        backend.push_report(KNOB_REPORT);

        let sink = RecordingSink::default();
        let mut poller = build(&backend, sink.clone());
        backend.fail_next_opens(2);

        // Gone, then two failed re-opens.
        for _ in 0..3 {
            poller.stats.iterations += 1;
            match poller.state {
                ResilienceState::Connected => poller.poll_once(),
                ResilienceState::Reconnecting { attempt, .. } => poller.try_reconnect(attempt),
            }
        }

        assert_eq!(backend.reads_attempted(), 1);
        assert_eq!(poller.state(), ResilienceState::Reconnecting { attempt: 2, persistent: false });

        let stats = poller.run();
        assert_eq!(stats.reconnects, 1);
        assert_eq!(sink.seen().last(), Some(&Seen::Gesture(KNOB_UP)));
    }

    #[test]
    fn test_persistent_failure_is_surfaced_and_still_recovers() {
        let backend = ScriptedBackend::new();
        backend.push_error(rusb::Error::NoDevice);
        backend.push_report(BUTTON_REPORT);

        let sink = RecordingSink::default();
        let poller = build(&backend, sink.clone());
        backend.fail_next_opens(4);

        let stats = poller.run();

        assert_eq!(
            sink.seen(),
            vec![
                Seen::Link(ResilienceState::Reconnecting { attempt: 0, persistent: false }),
                Seen::Link(ResilienceState::Reconnecting { attempt: 3, persistent: true }),
                Seen::Link(ResilienceState::Connected),
                Seen::Gesture(BUTTON),
            ]
        );
        assert_eq!(stats.reconnects, 1);
    }

    #[test]
    fn test_timeouts_and_transient_errors_change_nothing() {
        let backend = ScriptedBackend::new();
        backend.push_error(rusb::Error::Timeout);
        backend.push_error(rusb::Error::Pipe);
        backend.push_error(rusb::Error::Overflow);
        backend.push_error(rusb::Error::Timeout);

        let mut sink = MockSink::new();
        sink.expect_dispatch().never();
        sink.expect_link_state().never();

        let stats = build(&backend, sink).run();

        assert_eq!(stats.transient_errors, 2);
        assert_eq!(stats.gestures, 0);
        assert_eq!(stats.reconnects, 0);
        assert_eq!(backend.opens(), 1);
    }

    #[test]
    fn test_dispatch_failure_is_counted_not_fatal() {
        let backend = ScriptedBackend::new();
        backend.push_report(KNOB_REPORT);
        backend.push_report(BUTTON_REPORT);

        let mut sink = MockSink::new();
        sink.expect_dispatch().with(eq(KNOB_UP)).times(1).returning(|_| Err(DispatchError::QueueFull));
        sink.expect_dispatch().with(eq(BUTTON)).times(1).returning(|_| Ok(()));

        let stats = build(&backend, sink).run();

        assert_eq!(stats.gestures, 2);
        assert_eq!(stats.dispatch_failures, 1);
    }

    #[test]
    fn test_shutdown_during_reconnect_releases_handle() {
        let backend = ScriptedBackend::new();
        backend.push_error(rusb::Error::NoDevice);

        let shutdown = Shutdown::new();
        let handle = DeviceHandle::open_and_claim(backend.clone(), DeviceId::default()).unwrap();
        let config = PollConfig {
            backoff: Backoff { initial: Duration::from_secs(60), max: Duration::from_secs(60), ceiling: 0 },
            ..fast_config()
        };
        let mut sink = MockSink::new();
        sink.expect_link_state().returning(|_| ());
        let poller = ResilienceLoop::new(
            handle,
            SignatureTable::default(),
            sink,
            config,
            shutdown.clone(),
        );
        backend.fail_next_opens(1);

        let remote = shutdown.clone();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.trigger();
        });

        let stats = poller.run();
        stopper.join().unwrap();

        assert_eq!(stats.reconnects, 0);
        assert_eq!(backend.live_claims(), 0);
        assert_eq!(backend.releases(), 1);
    }

    #[test]
    fn test_release_on_normal_shutdown() {
        let backend = ScriptedBackend::new();
        let stats = build(&backend, RecordingSink::default()).run();

        assert!(stats.iterations >= 1);
        assert_eq!(backend.releases(), 1);
        assert_eq!(backend.live_claims(), 0);
    }
}
