//! Connectivity state record
//!
//! [`ConnectivityState`] is read-only outside this module tree. Transitions
//! are applied by the supervisor through the crate-private methods below,
//! which keep the attempt-count invariants in one place.

use std::fmt;
use std::time::Duration;

/// Supervisor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Link associated and addressed; requests are accepted.
    Connected,
    /// Link down; tick-driven reconnect attempts apply.
    Disconnected,
    /// A reconnect attempt is in flight.
    Reconnecting,
    /// Retry budget exhausted; waiting for the restart deadline.
    Escalated,
}

impl Phase {
    /// Lowercase name used in logs and status output.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Connected => "connected",
            Phase::Disconnected => "disconnected",
            Phase::Reconnecting => "reconnecting",
            Phase::Escalated => "escalated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide connectivity state, owned by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityState {
    phase: Phase,
    attempt_count: u32,
    last_check_at: Option<Duration>,
    last_attempt_at: Option<Duration>,
}

impl ConnectivityState {
    /// Initial state: `Disconnected`, no attempts, nothing checked yet.
    pub fn new() -> Self {
        Self {
            phase: Phase::Disconnected,
            attempt_count: 0,
            last_check_at: None,
            last_attempt_at: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consecutive reconnect attempts since the last `Connected`.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Time of the last gated status check.
    pub fn last_check_at(&self) -> Option<Duration> {
        self.last_check_at
    }

    /// Time the last reconnect attempt started.
    pub fn last_attempt_at(&self) -> Option<Duration> {
        self.last_attempt_at
    }

    /// Whether the link is up.
    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }

    pub(super) fn enter_connected(&mut self) {
        self.phase = Phase::Connected;
        self.attempt_count = 0;
    }

    pub(super) fn enter_disconnected(&mut self) {
        self.phase = Phase::Disconnected;
    }

    pub(super) fn enter_escalated(&mut self) {
        self.phase = Phase::Escalated;
    }

    pub(super) fn record_check(&mut self, now: Duration) {
        self.last_check_at = Some(now);
    }

    /// Start an attempt. The caller has already checked the budget.
    pub(super) fn begin_attempt(&mut self, now: Duration) -> u32 {
        self.attempt_count += 1;
        self.last_attempt_at = Some(now);
        self.phase = Phase::Reconnecting;
        self.attempt_count
    }

    /// Time since the last attempt started, or `None` if there never was one.
    pub(super) fn since_last_attempt(&self, now: Duration) -> Option<Duration> {
        self.last_attempt_at.map(|at| now.saturating_sub(at))
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}
