//! Device main loop
//!
//! The firmware core is single-threaded and cooperative. [`DeviceLoop`]
//! owns the connectivity supervisor and the router and runs on one
//! dedicated thread: every iteration pulses the watchdog, ticks the
//! supervisor and serves at most one queued request. The HTTP transport
//! reaches it through a cloneable [`DeviceHandle`], so requests are handled
//! strictly one at a time and in arrival order.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::connectivity::ConnectivitySupervisor;
use crate::error::CamcpError;
use crate::hal::Watchdog;
use crate::mcp::protocol::HttpReply;
use crate::mcp::router::Router;

struct Job {
    body: Bytes,
    reply: oneshot::Sender<HttpReply>,
}

/// Submits POST bodies to the device loop.
#[derive(Clone)]
pub struct DeviceHandle {
    jobs: mpsc::Sender<Job>,
}

impl DeviceHandle {
    /// Queue a request body and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`CamcpError::Transport`] if the device loop has stopped.
    pub async fn submit(&self, body: Bytes) -> Result<HttpReply, CamcpError> {
        let (reply, receive) = oneshot::channel();
        self.jobs
            .send(Job { body, reply })
            .await
            .map_err(|_| CamcpError::Transport("device loop stopped".to_string()))?;
        receive
            .await
            .map_err(|_| CamcpError::Transport("device loop dropped the request".to_string()))
    }
}

/// The cooperative main loop.
pub struct DeviceLoop {
    supervisor: ConnectivitySupervisor,
    router: Router,
    watchdog: Arc<dyn Watchdog>,
    jobs: mpsc::Receiver<Job>,
    idle_period: Duration,
}

impl DeviceLoop {
    /// Create the loop and the handle that feeds it.
    pub fn new(
        supervisor: ConnectivitySupervisor,
        router: Router,
        watchdog: Arc<dyn Watchdog>,
        queue_capacity: usize,
        idle_period: Duration,
    ) -> (Self, DeviceHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let device = Self {
            supervisor,
            router,
            watchdog,
            jobs: rx,
            idle_period,
        };
        (device, DeviceHandle { jobs: tx })
    }

    /// The connectivity supervisor.
    pub fn supervisor(&self) -> &ConnectivitySupervisor {
        &self.supervisor
    }

    /// Initial association; see [`ConnectivitySupervisor::boot`].
    pub fn boot(&mut self) -> bool {
        self.watchdog.pulse();
        self.supervisor.boot()
    }

    /// Run one iteration. Returns `true` if a request was served.
    pub fn run_once(&mut self) -> bool {
        self.watchdog.pulse();
        self.supervisor.tick();

        match self.jobs.try_recv() {
            Ok(job) => {
                let reply = self.handle_post(&job.body);
                if job.reply.send(reply).is_err() {
                    tracing::debug!("Client went away before the reply was ready");
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Gate on readiness, then route.
    ///
    /// While the link is down the body is not even parsed.
    pub fn handle_post(&self, body: &[u8]) -> HttpReply {
        if !self.supervisor.is_ready() {
            tracing::warn!(phase = %self.supervisor.state().phase(), "Rejecting request while link is down");
            return HttpReply::unavailable();
        }
        self.router.handle(body)
    }

    /// Boot, then run until `shutdown` is cancelled. Blocks the calling
    /// thread, including for the initial association.
    pub fn boot_and_run(mut self, shutdown: CancellationToken) {
        self.boot();
        self.run(shutdown);
    }

    /// Run until `shutdown` is cancelled. Blocks the calling thread.
    pub fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Device loop started");
        while !shutdown.is_cancelled() {
            if !self.run_once() {
                std::thread::sleep(self.idle_period);
            }
        }
        tracing::info!("Device loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{inbox, ManualClock, SupervisorTiming};
    use crate::hal::{Link, LinkInfo, Restart};
    use crate::mcp::types::Implementation;
    use crate::tools::ToolRegistry;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedLink(AtomicBool);

    impl Link for FixedLink {
        fn is_connected(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn reconnect(&self, _timeout: Duration) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn info(&self) -> LinkInfo {
            LinkInfo::default()
        }
    }

    struct NoRestart;

    impl Restart for NoRestart {
        fn restart(&self) {}
    }

    #[derive(Default)]
    struct CountingWatchdog(AtomicUsize);

    impl Watchdog for CountingWatchdog {
        fn pulse(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn device(link_up: bool) -> (DeviceLoop, DeviceHandle, Arc<CountingWatchdog>) {
        let watchdog = Arc::new(CountingWatchdog::default());
        let (_events, rx) = inbox(4);
        let mut supervisor = ConnectivitySupervisor::new(
            SupervisorTiming::default(),
            Arc::new(FixedLink(AtomicBool::new(link_up))),
            Arc::new(NoRestart),
            watchdog.clone(),
            Arc::new(ManualClock::new()),
            rx,
        );
        supervisor.boot();
        let router = Router::new(
            ToolRegistry::new(),
            Implementation {
                name: "test".to_string(),
                version: "0".to_string(),
            },
            "2024-11-05",
        );
        let (device, handle) =
            DeviceLoop::new(supervisor, router, watchdog.clone(), 4, Duration::from_millis(1));
        (device, handle, watchdog)
    }

    #[test]
    fn test_handle_post_when_ready() {
        let (device, _handle, _) = device(true);
        let reply = device.handle_post(br#"{"id":1,"method":"tools/list"}"#);
        assert_eq!(reply.status, 200);
    }

    #[test]
    fn test_handle_post_when_not_ready_skips_parsing() {
        let (device, _handle, _) = device(false);
        let reply = device.handle_post(b"not even json");
        assert_eq!(reply, HttpReply::unavailable());
    }

    #[test]
    fn test_run_once_pulses_watchdog_when_idle() {
        let (mut device, _handle, watchdog) = device(true);
        let before = watchdog.0.load(Ordering::SeqCst);
        assert!(!device.run_once());
        assert_eq!(watchdog.0.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_submit_round_trip_through_loop() {
        let (device, handle, _) = device(true);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let worker = tokio::task::spawn_blocking(move || device.run(token));

        let reply = handle
            .submit(Bytes::from_static(br#"{"id":"a","method":"initialize"}"#))
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains(r#""id":"a""#));

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[derive(Default)]
    struct ThreadRecordingLink {
        reconnected_on: std::sync::Mutex<Option<std::thread::ThreadId>>,
    }

    impl Link for ThreadRecordingLink {
        fn is_connected(&self) -> bool {
            self.reconnected_on.lock().unwrap().is_some()
        }

        fn reconnect(&self, _timeout: Duration) -> bool {
            *self.reconnected_on.lock().unwrap() = Some(std::thread::current().id());
            true
        }

        fn info(&self) -> LinkInfo {
            LinkInfo::default()
        }
    }

    #[tokio::test]
    async fn test_boot_and_run_associates_on_loop_thread() {
        let link = Arc::new(ThreadRecordingLink::default());
        let (_events, rx) = inbox(4);
        let supervisor = ConnectivitySupervisor::new(
            SupervisorTiming::default(),
            link.clone(),
            Arc::new(NoRestart),
            Arc::new(CountingWatchdog::default()),
            Arc::new(ManualClock::new()),
            rx,
        );
        let router = Router::new(
            ToolRegistry::new(),
            Implementation {
                name: "test".to_string(),
                version: "0".to_string(),
            },
            "2024-11-05",
        );
        let (device, handle) = DeviceLoop::new(
            supervisor,
            router,
            Arc::new(CountingWatchdog::default()),
            4,
            Duration::from_millis(1),
        );

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let worker = tokio::task::spawn_blocking(move || device.boot_and_run(token));

        let reply = handle
            .submit(Bytes::from_static(br#"{"id":1,"method":"tools/list"}"#))
            .await
            .unwrap();
        assert_eq!(reply.status, 200);

        let booted_on = link.reconnected_on.lock().unwrap().expect("boot reconnected");
        assert_ne!(booted_on, std::thread::current().id());

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_after_loop_stopped() {
        let (device, handle, _) = device(true);
        drop(device);
        let err = handle.submit(Bytes::from_static(b"{}")).await.unwrap_err();
        assert!(matches!(err, CamcpError::Transport(_)));
    }
}
