//! Bounded-retry reconnect state machine
//!
//! The supervisor is ticked from every iteration of the device loop. Ticks
//! are cheap until `check_interval` has passed; then the supervisor
//! reconciles its phase against the authoritative link status and, while
//! down, issues at most one reconnect attempt per `reconnect_interval`. Once
//! `max_reconnect_attempts` consecutive attempts have failed it escalates and
//! restarts the device `reboot_delay` after the last attempt.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ConnectivityConfig;
use crate::connectivity::clock::Clock;
use crate::connectivity::events::{LinkEvent, LinkEventInbox};
use crate::connectivity::state::{ConnectivityState, Phase};
use crate::hal::{Capabilities, Link, Restart, Watchdog};

/// Timing and budget parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Minimum spacing between status checks.
    pub check_interval: Duration,
    /// Minimum spacing between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Delay between the last attempt and the restart once escalated.
    pub reboot_delay: Duration,
    /// Bound on one blocking reconnect attempt.
    pub connect_timeout: Duration,
    /// Attempts allowed before escalating.
    pub max_reconnect_attempts: u32,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(5_000),
            reconnect_interval: Duration::from_millis(30_000),
            reboot_delay: Duration::from_millis(60_000),
            connect_timeout: Duration::from_millis(10_000),
            max_reconnect_attempts: 5,
        }
    }
}

impl From<&ConnectivityConfig> for SupervisorTiming {
    fn from(config: &ConnectivityConfig) -> Self {
        Self {
            check_interval: Duration::from_millis(config.check_interval_ms),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms),
            reboot_delay: Duration::from_millis(config.reboot_delay_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The check interval has not elapsed yet.
    Skipped,
    /// Link is up; nothing to do.
    Healthy,
    /// Link is down but the reconnect interval has not elapsed.
    Waiting,
    /// A reconnect attempt ran.
    Attempted {
        /// Attempt number within the current outage.
        attempt: u32,
        /// Whether the link came up.
        connected: bool,
    },
    /// Escalated and waiting for the restart deadline.
    Escalated,
    /// The restart capability was invoked on this tick.
    RestartIssued,
}

/// Owns [`ConnectivityState`] and drives it from ticks and link events.
pub struct ConnectivitySupervisor {
    state: ConnectivityState,
    timing: SupervisorTiming,
    link: Arc<dyn Link>,
    restart: Arc<dyn Restart>,
    watchdog: Arc<dyn Watchdog>,
    clock: Arc<dyn Clock>,
    inbox: LinkEventInbox,
    restart_issued: bool,
}

impl ConnectivitySupervisor {
    /// Create a supervisor in the `Disconnected` phase.
    pub fn new(
        timing: SupervisorTiming,
        link: Arc<dyn Link>,
        restart: Arc<dyn Restart>,
        watchdog: Arc<dyn Watchdog>,
        clock: Arc<dyn Clock>,
        inbox: LinkEventInbox,
    ) -> Self {
        Self {
            state: ConnectivityState::new(),
            timing,
            link,
            restart,
            watchdog,
            clock,
            inbox,
            restart_issued: false,
        }
    }

    /// Create a supervisor wired to the link, restart and watchdog of a
    /// capability set.
    pub fn from_capabilities(
        timing: SupervisorTiming,
        capabilities: &Capabilities,
        clock: Arc<dyn Clock>,
        inbox: LinkEventInbox,
    ) -> Self {
        Self::new(
            timing,
            Arc::clone(&capabilities.link),
            Arc::clone(&capabilities.restart),
            Arc::clone(&capabilities.watchdog),
            clock,
            inbox,
        )
    }

    /// Current state (read-only).
    pub fn state(&self) -> &ConnectivityState {
        &self.state
    }

    /// Timing parameters in effect.
    pub fn timing(&self) -> &SupervisorTiming {
        &self.timing
    }

    /// Whether protocol requests may be served.
    pub fn is_ready(&self) -> bool {
        self.state.is_connected()
    }

    /// Whether the restart capability has been invoked for the current
    /// escalation.
    pub fn restart_issued(&self) -> bool {
        self.restart_issued
    }

    /// Initial association at startup.
    ///
    /// Returns `true` on success. On failure the device is restarted; if the
    /// restart capability returns, the supervisor stays `Disconnected` and
    /// normal tick-driven recovery applies.
    pub fn boot(&mut self) -> bool {
        info!(
            timeout_ms = self.timing.connect_timeout.as_millis() as u64,
            "Associating with network"
        );
        if self.blocking_reconnect() {
            self.enter_connected("initial association");
            let link = self.link.info();
            info!(ssid = %link.ssid, ip = %link.ip, "Network ready");
            true
        } else {
            error!("Initial association failed; restarting device");
            self.restart.restart();
            false
        }
    }

    /// Advance the state machine. Called once per loop iteration.
    pub fn tick(&mut self) -> TickOutcome {
        for event in self.inbox.drain() {
            self.ingest(event);
        }

        let now = self.clock.now();
        if let Some(last) = self.state.last_check_at() {
            if now.saturating_sub(last) < self.timing.check_interval {
                return TickOutcome::Skipped;
            }
        }
        self.state.record_check(now);

        let link_up = self.link.is_connected();
        self.reconcile(link_up);

        match self.state.phase() {
            Phase::Connected => TickOutcome::Healthy,
            Phase::Disconnected | Phase::Reconnecting => self.retry(now),
            Phase::Escalated => self.await_restart(now),
        }
    }

    /// Apply a link event. Only called from [`tick`](Self::tick), so event
    /// writes never interleave with tick-driven writes.
    fn ingest(&mut self, event: LinkEvent) {
        debug!(?event, phase = %self.state.phase(), "Link event");
        if event.is_up() {
            if !self.state.is_connected() {
                self.enter_connected("link event");
            }
        } else if self.state.phase() != Phase::Disconnected {
            warn!(?event, attempts = self.state.attempt_count(), "Link lost");
            self.state.enter_disconnected();
        }
    }

    /// Cross-check the phase against the polled link status in case an
    /// event was missed.
    fn reconcile(&mut self, link_up: bool) {
        match (self.state.phase(), link_up) {
            (Phase::Connected, true) => {}
            (Phase::Connected, false) => {
                warn!("Link down detected by status poll");
                self.state.enter_disconnected();
            }
            (_, true) => self.enter_connected("status poll"),
            (_, false) => {}
        }
    }

    fn retry(&mut self, now: Duration) -> TickOutcome {
        if let Some(elapsed) = self.state.since_last_attempt(now) {
            if elapsed < self.timing.reconnect_interval {
                return TickOutcome::Waiting;
            }
        }

        let max_attempts = self.timing.max_reconnect_attempts;
        if self.state.attempt_count() >= max_attempts {
            self.state.enter_escalated();
            error!(
                max_attempts,
                reboot_delay_ms = self.timing.reboot_delay.as_millis() as u64,
                "Max reconnection attempts reached; escalating to restart"
            );
            return self.await_restart(now);
        }

        let attempt = self.state.begin_attempt(now);
        info!(attempt, max_attempts, "Attempting to reconnect");
        if self.blocking_reconnect() {
            self.enter_connected("reconnect");
            TickOutcome::Attempted {
                attempt,
                connected: true,
            }
        } else {
            warn!(attempt, max_attempts, "Reconnect attempt failed");
            self.state.enter_disconnected();
            TickOutcome::Attempted {
                attempt,
                connected: false,
            }
        }
    }

    fn await_restart(&mut self, now: Duration) -> TickOutcome {
        if self.restart_issued {
            return TickOutcome::Escalated;
        }
        let due = self
            .state
            .since_last_attempt(now)
            .map_or(true, |elapsed| elapsed >= self.timing.reboot_delay);
        if !due {
            return TickOutcome::Escalated;
        }

        error!("Restarting device due to network connection failure");
        self.restart_issued = true;
        self.restart.restart();
        TickOutcome::RestartIssued
    }

    /// One reconnect call, bracketed by watchdog pulses.
    fn blocking_reconnect(&self) -> bool {
        self.watchdog.pulse();
        let connected = self.link.reconnect(self.timing.connect_timeout);
        self.watchdog.pulse();
        connected
    }

    fn enter_connected(&mut self, source: &'static str) {
        let previous = self.state.phase();
        self.state.enter_connected();
        self.restart_issued = false;
        if previous != Phase::Connected {
            info!(source, from = %previous, "Link connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::clock::ManualClock;
    use crate::connectivity::events::{inbox, LinkEventSender};
    use crate::hal::{LinkInfo, MockLink, MockRestart, MockWatchdog};
    use mockall::Sequence;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Link whose status and reconnect outcome are set by the test.
    #[derive(Default)]
    struct ScriptedLink {
        up: AtomicBool,
        reconnect_succeeds: AtomicBool,
        reconnects: AtomicU32,
    }

    impl Link for ScriptedLink {
        fn is_connected(&self) -> bool {
            self.up.load(Ordering::SeqCst)
        }

        fn reconnect(&self, _timeout: Duration) -> bool {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            let ok = self.reconnect_succeeds.load(Ordering::SeqCst);
            self.up.store(ok, Ordering::SeqCst);
            ok
        }

        fn info(&self) -> LinkInfo {
            LinkInfo::default()
        }
    }

    #[derive(Default)]
    struct CountingRestart(AtomicU32);

    impl Restart for CountingRestart {
        fn restart(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NoopWatchdog;

    impl Watchdog for NoopWatchdog {
        fn pulse(&self) {}
    }

    struct Harness {
        supervisor: ConnectivitySupervisor,
        link: Arc<ScriptedLink>,
        restart: Arc<CountingRestart>,
        clock: ManualClock,
        events: LinkEventSender,
    }

    fn harness() -> Harness {
        let link = Arc::new(ScriptedLink::default());
        let restart = Arc::new(CountingRestart::default());
        let clock = ManualClock::new();
        let (events, rx) = inbox(8);
        let supervisor = ConnectivitySupervisor::new(
            SupervisorTiming::default(),
            link.clone(),
            restart.clone(),
            Arc::new(NoopWatchdog),
            Arc::new(clock.clone()),
            rx,
        );
        Harness {
            supervisor,
            link,
            restart,
            clock,
            events,
        }
    }

    /// Bring a harness to `Connected` through a successful boot.
    fn connected_harness() -> Harness {
        let mut h = harness();
        h.link.reconnect_succeeds.store(true, Ordering::SeqCst);
        assert!(h.supervisor.boot());
        h.link.reconnect_succeeds.store(false, Ordering::SeqCst);
        h
    }

    #[test]
    fn test_boot_success_enters_connected() {
        let h = connected_harness();
        assert!(h.supervisor.is_ready());
        assert_eq!(h.supervisor.state().attempt_count(), 0);
        assert_eq!(h.restart.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_boot_failure_restarts() {
        let mut h = harness();
        assert!(!h.supervisor.boot());
        assert!(!h.supervisor.is_ready());
        assert_eq!(h.restart.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tick_is_gated_by_check_interval() {
        let mut h = connected_harness();
        assert_eq!(h.supervisor.tick(), TickOutcome::Healthy);
        h.clock.advance(Duration::from_millis(4_999));
        assert_eq!(h.supervisor.tick(), TickOutcome::Skipped);
        h.clock.advance(Duration::from_millis(1));
        assert_eq!(h.supervisor.tick(), TickOutcome::Healthy);
    }

    #[test]
    fn test_link_down_event_applies_before_gate() {
        let mut h = connected_harness();
        h.supervisor.tick();
        h.link.up.store(false, Ordering::SeqCst);
        h.events.notify(LinkEvent::LinkDown);

        h.clock.advance(Duration::from_millis(10));
        assert_eq!(h.supervisor.tick(), TickOutcome::Skipped);
        assert!(!h.supervisor.is_ready());
        assert_eq!(h.supervisor.state().phase(), Phase::Disconnected);
    }

    #[test]
    fn test_one_attempt_per_reconnect_interval() {
        let mut h = connected_harness();
        h.link.up.store(false, Ordering::SeqCst);
        h.events.notify(LinkEvent::LinkDown);

        // first attempt is immediate; boot did not count as one
        h.clock.advance(Duration::from_secs(5));
        assert_eq!(
            h.supervisor.tick(),
            TickOutcome::Attempted {
                attempt: 1,
                connected: false
            }
        );

        for _ in 0..5 {
            h.clock.advance(Duration::from_secs(5));
            assert_eq!(h.supervisor.tick(), TickOutcome::Waiting);
        }
        assert_eq!(h.supervisor.state().attempt_count(), 1);

        h.clock.advance(Duration::from_secs(5));
        assert_eq!(
            h.supervisor.tick(),
            TickOutcome::Attempted {
                attempt: 2,
                connected: false
            }
        );
        assert_eq!(h.link.reconnects.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_successful_attempt_resets_count() {
        let mut h = connected_harness();
        h.link.up.store(false, Ordering::SeqCst);
        for _ in 0..2 {
            h.clock.advance(Duration::from_secs(30));
            h.supervisor.tick();
        }
        assert_eq!(h.supervisor.state().attempt_count(), 2);

        h.link.reconnect_succeeds.store(true, Ordering::SeqCst);
        h.clock.advance(Duration::from_secs(30));
        assert_eq!(
            h.supervisor.tick(),
            TickOutcome::Attempted {
                attempt: 3,
                connected: true
            }
        );
        assert!(h.supervisor.is_ready());
        assert_eq!(h.supervisor.state().attempt_count(), 0);
    }

    #[test]
    fn test_up_event_resets_count_without_tick_gate() {
        let mut h = connected_harness();
        h.link.up.store(false, Ordering::SeqCst);
        h.clock.advance(Duration::from_secs(30));
        h.supervisor.tick();
        assert_eq!(h.supervisor.state().attempt_count(), 1);

        h.link.up.store(true, Ordering::SeqCst);
        h.events.notify(LinkEvent::AddressAcquired);
        h.clock.advance(Duration::from_millis(1));
        assert_eq!(h.supervisor.tick(), TickOutcome::Skipped);
        assert!(h.supervisor.is_ready());
        assert_eq!(h.supervisor.state().attempt_count(), 0);
    }

    #[test]
    fn test_missed_event_is_reconciled_by_poll() {
        let mut h = connected_harness();
        h.supervisor.tick();

        // link drops with no event
        h.link.up.store(false, Ordering::SeqCst);
        h.clock.advance(Duration::from_secs(5));
        let outcome = h.supervisor.tick();
        assert!(matches!(outcome, TickOutcome::Attempted { attempt: 1, .. }));

        // link recovers with no event
        h.link.up.store(true, Ordering::SeqCst);
        h.clock.advance(Duration::from_secs(5));
        assert_eq!(h.supervisor.tick(), TickOutcome::Healthy);
        assert_eq!(h.supervisor.state().attempt_count(), 0);
    }

    #[test]
    fn test_escalates_and_restarts_exactly_once() {
        let mut h = connected_harness();
        h.link.up.store(false, Ordering::SeqCst);

        let mut last_attempt = Duration::ZERO;
        for expected in 1..=5 {
            h.clock.advance(Duration::from_secs(30));
            assert_eq!(
                h.supervisor.tick(),
                TickOutcome::Attempted {
                    attempt: expected,
                    connected: false
                }
            );
            last_attempt = h.clock.now();
        }
        assert_eq!(h.supervisor.state().attempt_count(), 5);

        h.clock.advance(Duration::from_secs(30));
        assert_eq!(h.supervisor.tick(), TickOutcome::Escalated);
        assert_eq!(h.supervisor.state().phase(), Phase::Escalated);
        assert_eq!(h.supervisor.state().last_attempt_at(), Some(last_attempt));

        h.clock.advance(Duration::from_secs(25));
        assert_eq!(h.supervisor.tick(), TickOutcome::Escalated);
        assert_eq!(h.restart.0.load(Ordering::SeqCst), 0);

        // exactly reboot_delay after the last attempt
        h.clock.advance(Duration::from_secs(5));
        assert_eq!(h.supervisor.tick(), TickOutcome::RestartIssued);
        assert_eq!(h.restart.0.load(Ordering::SeqCst), 1);

        for _ in 0..10 {
            h.clock.advance(Duration::from_secs(60));
            assert_eq!(h.supervisor.tick(), TickOutcome::Escalated);
        }
        assert_eq!(h.restart.0.load(Ordering::SeqCst), 1);
        assert_eq!(h.link.reconnects.load(Ordering::SeqCst), 6);
        assert!(h.supervisor.state().attempt_count() <= 5);
    }

    #[test]
    fn test_recovery_while_escalated_rearms_restart() {
        let mut h = connected_harness();
        h.link.up.store(false, Ordering::SeqCst);
        for _ in 0..6 {
            h.clock.advance(Duration::from_secs(30));
            h.supervisor.tick();
        }
        assert_eq!(h.supervisor.state().phase(), Phase::Escalated);

        h.link.up.store(true, Ordering::SeqCst);
        h.events.notify(LinkEvent::LinkUp);
        h.clock.advance(Duration::from_secs(5));
        assert_eq!(h.supervisor.tick(), TickOutcome::Healthy);
        assert!(!h.supervisor.restart_issued());
        assert_eq!(h.restart.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_watchdog_pulsed_around_reconnect() {
        let mut seq = Sequence::new();
        let mut watchdog = MockWatchdog::new();
        let mut link = MockLink::new();

        link.expect_is_connected().return_const(false);
        watchdog
            .expect_pulse()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        link.expect_reconnect()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|timeout| *timeout == Duration::from_secs(10))
            .return_const(false);
        watchdog
            .expect_pulse()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut restart = MockRestart::new();
        restart.expect_restart().never();

        let (_events, rx) = inbox(1);
        let mut supervisor = ConnectivitySupervisor::new(
            SupervisorTiming::default(),
            Arc::new(link),
            Arc::new(restart),
            Arc::new(watchdog),
            Arc::new(ManualClock::new()),
            rx,
        );

        assert_eq!(
            supervisor.tick(),
            TickOutcome::Attempted {
                attempt: 1,
                connected: false
            }
        );
    }

    #[test]
    fn test_timing_from_config() {
        let config = ConnectivityConfig {
            check_interval_ms: 100,
            reconnect_interval_ms: 200,
            reboot_delay_ms: 300,
            connect_timeout_ms: 50,
            max_reconnect_attempts: 2,
            ..ConnectivityConfig::default()
        };
        let timing = SupervisorTiming::from(&config);
        assert_eq!(timing.check_interval, Duration::from_millis(100));
        assert_eq!(timing.reconnect_interval, Duration::from_millis(200));
        assert_eq!(timing.reboot_delay, Duration::from_millis(300));
        assert_eq!(timing.connect_timeout, Duration::from_millis(50));
        assert_eq!(timing.max_reconnect_attempts, 2);
    }
}
