//! Shared fakes for integration tests
//!
//! The `mockall` mocks only exist inside the library's unit tests, so the
//! integration suites drive the device through these recording fakes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use camcp::commands::build_device;
use camcp::config::Config;
use camcp::connectivity::{inbox, LinkEventInbox, ManualClock};
use camcp::device::{DeviceHandle, DeviceLoop};
use camcp::error::HalError;
use camcp::hal::{
    Actuator, Camera, Capabilities, Link, LinkInfo, Restart, SystemInfo, SystemSnapshot, Watchdog,
};

/// Actuator that records every edge and pulse instead of sleeping.
#[derive(Default)]
pub struct RecordingActuator {
    pub edges: Mutex<Vec<bool>>,
    pub pulses: Mutex<Vec<Duration>>,
}

impl Actuator for RecordingActuator {
    fn set(&self, on: bool) -> Result<(), HalError> {
        self.edges.lock().unwrap().push(on);
        Ok(())
    }

    fn pulse(&self, duration: Duration) -> Result<(), HalError> {
        self.pulses.lock().unwrap().push(duration);
        Ok(())
    }
}

/// Camera that serves a fixed frame.
pub struct FixedCamera {
    pub frame: Vec<u8>,
    pub captures: AtomicUsize,
}

impl FixedCamera {
    pub fn new(frame: &[u8]) -> Self {
        Self {
            frame: frame.to_vec(),
            captures: AtomicUsize::new(0),
        }
    }
}

impl Camera for FixedCamera {
    fn init_status(&self) -> Result<(), HalError> {
        Ok(())
    }

    fn capture(&self) -> Result<Vec<u8>, HalError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }
}

/// Link whose state and reconnect outcome the test controls.
#[derive(Default)]
pub struct SwitchLink {
    pub connected: AtomicBool,
    pub reachable: AtomicBool,
    pub reconnects: AtomicUsize,
}

impl SwitchLink {
    pub fn up() -> Self {
        Self {
            connected: AtomicBool::new(true),
            reachable: AtomicBool::new(true),
            reconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl Link for SwitchLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn reconnect(&self, _timeout: Duration) -> bool {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        let up = self.reachable.load(Ordering::SeqCst);
        self.connected.store(up, Ordering::SeqCst);
        up
    }

    fn info(&self) -> LinkInfo {
        LinkInfo {
            ssid: "camera-lab".to_string(),
            ip: "192.168.4.20".to_string(),
            rssi_dbm: -61,
            mac: "24:6F:28:AA:BB:CC".to_string(),
            gateway: "192.168.4.1".to_string(),
            dns: "192.168.4.1".to_string(),
        }
    }
}

#[derive(Default)]
pub struct CountingRestart(pub AtomicUsize);

impl CountingRestart {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Restart for CountingRestart {
    fn restart(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct NoopWatchdog;

impl Watchdog for NoopWatchdog {
    fn pulse(&self) {}
}

pub struct FixedSystem;

impl SystemInfo for FixedSystem {
    fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            uptime: Duration::from_secs(42),
            free_heap: Some(123_456),
            min_free_heap: Some(100_000),
            max_alloc_heap: Some(90_000),
            cpu_mhz: Some(240),
            flash_size: Some(4_194_304),
            sdk_version: Some("v4.4.7".to_string()),
            cpu_cores: 2,
            firmware_version: "1.0.0".to_string(),
            reset_reason: "power-on".to_string(),
            temperature_c: None,
            ..SystemSnapshot::default()
        }
    }
}

/// Handles on every fake wired into a device.
pub struct Rig {
    pub led: Arc<RecordingActuator>,
    pub flash: Arc<RecordingActuator>,
    pub camera: Arc<FixedCamera>,
    pub link: Arc<SwitchLink>,
    pub restart: Arc<CountingRestart>,
    pub clock: ManualClock,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            led: Arc::new(RecordingActuator::default()),
            flash: Arc::new(RecordingActuator::default()),
            camera: Arc::new(FixedCamera::new(b"\xFF\xD8fake-jpeg\xFF\xD9")),
            link: Arc::new(SwitchLink::up()),
            restart: Arc::new(CountingRestart::default()),
            clock: ManualClock::new(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            led: self.led.clone(),
            flash: self.flash.clone(),
            camera: self.camera.clone(),
            link: self.link.clone(),
            restart: self.restart.clone(),
            watchdog: Arc::new(NoopWatchdog),
            system: Arc::new(FixedSystem),
        }
    }

    /// Build and boot a device over the fakes with a private event inbox.
    pub fn device(&self, config: &Config) -> (DeviceLoop, DeviceHandle) {
        let (_events, rx) = inbox(4);
        self.device_with_inbox(config, rx)
    }

    pub fn device_with_inbox(
        &self,
        config: &Config,
        rx: LinkEventInbox,
    ) -> (DeviceLoop, DeviceHandle) {
        let (mut device, handle) = build_device(
            config,
            self.capabilities(),
            Arc::new(self.clock.clone()),
            rx,
        )
        .expect("device builds");
        device.boot();
        (device, handle)
    }
}

/// Config with zero flash settle and no warm-up frames so tests stay fast.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.network.ssid = "camera-lab".to_string();
    config.camera.warmup_frames = 0;
    config.camera.flash_settle_ms = 0;
    config
}
