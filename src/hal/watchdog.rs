//! Software liveness watchdog
//!
//! The device loop feeds the watchdog once per iteration. A monitor thread
//! checks the time since the last pulse and, when the deadline passes, runs
//! the expiry action (by default: log and abort the process so the service
//! manager restarts it). This is the last-resort reset for a loop stuck in a
//! capability call.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::hal::Watchdog;

/// Shortest interval between two monitor checks.
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(5);

struct Inner {
    started: Instant,
    last_pulse_ms: AtomicU64,
    timeout: Duration,
    stopped: AtomicBool,
}

impl Inner {
    fn since_last_pulse(&self) -> Duration {
        let now_ms = self.started.elapsed().as_millis() as u64;
        let last_ms = self.last_pulse_ms.load(Ordering::Acquire);
        Duration::from_millis(now_ms.saturating_sub(last_ms))
    }
}

/// A watchdog backed by a monitor thread.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use camcp::hal::Watchdog;
/// use camcp::hal::watchdog::SoftwareWatchdog;
///
/// let watchdog = SoftwareWatchdog::start(Duration::from_secs(30)).unwrap();
/// watchdog.pulse();
/// ```
pub struct SoftwareWatchdog {
    inner: Arc<Inner>,
}

impl SoftwareWatchdog {
    /// Start a watchdog that aborts the process on expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor thread cannot be spawned.
    pub fn start(timeout: Duration) -> std::io::Result<Self> {
        Self::start_with(timeout, |overdue| {
            tracing::error!(
                overdue_ms = overdue.as_millis() as u64,
                "Watchdog deadline missed; forcing reset"
            );
            std::process::abort();
        })
    }

    /// Start a watchdog with a custom expiry action.
    ///
    /// The action runs at most once, on the monitor thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor thread cannot be spawned.
    pub fn start_with<F>(timeout: Duration, on_expire: F) -> std::io::Result<Self>
    where
        F: FnOnce(Duration) + Send + 'static,
    {
        let inner = Arc::new(Inner {
            started: Instant::now(),
            last_pulse_ms: AtomicU64::new(0),
            timeout,
            stopped: AtomicBool::new(false),
        });

        let monitor = Arc::clone(&inner);
        let check_every = (timeout / 4).max(MIN_CHECK_INTERVAL);
        thread::Builder::new()
            .name("watchdog".to_string())
            .spawn(move || loop {
                thread::sleep(check_every);
                if monitor.stopped.load(Ordering::Acquire) {
                    break;
                }
                let overdue = monitor.since_last_pulse();
                if overdue > monitor.timeout {
                    on_expire(overdue);
                    break;
                }
            })?;

        tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Watchdog armed");
        Ok(Self { inner })
    }

    /// Disarm the monitor thread.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
    }

    /// Time elapsed since the last pulse (or since start).
    pub fn since_last_pulse(&self) -> Duration {
        self.inner.since_last_pulse()
    }
}

impl Watchdog for SoftwareWatchdog {
    fn pulse(&self) {
        let now_ms = self.inner.started.elapsed().as_millis() as u64;
        self.inner.last_pulse_ms.store(now_ms, Ordering::Release);
    }
}

impl Drop for SoftwareWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Watchdog used when `watchdog.enabled` is false.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledWatchdog;

impl Watchdog for DisabledWatchdog {
    fn pulse(&self) {}
}
