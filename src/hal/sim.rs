//! Host-side capability providers
//!
//! Stand-ins used when the firmware core runs on a regular machine: the
//! actuators only log, the camera serves a JPEG from disk, the link reports
//! the host's own address, and a restart exits the process so the service
//! manager can start it again.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::connectivity::events::{LinkEvent, LinkEventSender};
use crate::error::HalError;
use crate::hal::{
    Actuator, Camera, Capabilities, Link, LinkInfo, Restart, SystemInfo, SystemSnapshot, Watchdog,
};

/// Exit status used by [`ProcessRestart`].
pub const RESTART_EXIT_CODE: i32 = 3;

/// Build the provider set used by the `serve` and `tools` commands.
pub fn host_capabilities(
    config: &Config,
    events: Option<LinkEventSender>,
    watchdog: Arc<dyn Watchdog>,
) -> Capabilities {
    Capabilities {
        led: Arc::new(SimulatedActuator::new("led")),
        flash: Arc::new(SimulatedActuator::new("flash")),
        camera: Arc::new(FileCamera::open(config.camera.image_path.as_deref())),
        link: Arc::new(SimulatedLink::new(&config.network.ssid, events)),
        restart: Arc::new(ProcessRestart),
        watchdog,
        system: Arc::new(HostSystemInfo::new()),
    }
}

/// An on/off output that records and logs its state.
#[derive(Debug)]
pub struct SimulatedActuator {
    name: &'static str,
    on: AtomicBool,
}

impl SimulatedActuator {
    /// A switched-off actuator.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            on: AtomicBool::new(false),
        }
    }

    /// Current output state.
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

impl Actuator for SimulatedActuator {
    fn set(&self, on: bool) -> Result<(), HalError> {
        self.on.store(on, Ordering::SeqCst);
        info!(actuator = self.name, on, "Actuator switched");
        Ok(())
    }
}

/// Camera that serves the bytes of a file as every frame.
#[derive(Debug)]
pub struct FileCamera {
    path: Option<PathBuf>,
    init_error: Option<String>,
}

impl FileCamera {
    /// Open a camera backed by `path`.
    ///
    /// The camera reports an initialization failure when no path is given
    /// or the file cannot be read.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            warn!("No camera image configured; camera disabled");
            return Self {
                path: None,
                init_error: Some("no image source configured".to_string()),
            };
        };

        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                info!(path = %path.display(), "Camera initialized");
                Self {
                    path: Some(path.to_path_buf()),
                    init_error: None,
                }
            }
            Ok(_) => Self::failed(path, "not a regular file".to_string()),
            Err(e) => Self::failed(path, e.to_string()),
        }
    }

    fn failed(path: &Path, reason: String) -> Self {
        error!(path = %path.display(), %reason, "Camera init failed");
        Self {
            path: None,
            init_error: Some(format!("{}: {}", path.display(), reason)),
        }
    }
}

impl Camera for FileCamera {
    fn init_status(&self) -> Result<(), HalError> {
        match &self.init_error {
            Some(reason) => Err(HalError::CameraUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn capture(&self) -> Result<Vec<u8>, HalError> {
        let Some(path) = &self.path else {
            return Err(HalError::CameraUnavailable(
                "no image source configured".to_string(),
            ));
        };
        let frame = fs::read(path).map_err(|e| HalError::CaptureFailed(e.to_string()))?;
        if frame.is_empty() {
            return Err(HalError::CaptureFailed("empty frame".to_string()));
        }
        debug!(bytes = frame.len(), "Frame captured");
        Ok(frame)
    }
}

/// Link that reflects the host's network and posts events like a radio
/// driver would.
#[derive(Debug)]
pub struct SimulatedLink {
    ssid: String,
    connected: AtomicBool,
    reachable: AtomicBool,
    events: Option<LinkEventSender>,
}

impl SimulatedLink {
    /// A link that starts down and comes up on the first reconnect.
    pub fn new(ssid: &str, events: Option<LinkEventSender>) -> Self {
        Self {
            ssid: ssid.to_string(),
            connected: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            events,
        }
    }

    /// Make the access point (un)reachable for later reconnects.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Drop the association and post the matching events.
    pub fn drop_link(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.notify(LinkEvent::AddressLost);
            self.notify(LinkEvent::LinkDown);
        }
    }

    fn notify(&self, event: LinkEvent) {
        if let Some(events) = &self.events {
            events.notify(event);
        }
    }
}

impl Link for SimulatedLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn reconnect(&self, timeout: Duration) -> bool {
        self.drop_link();
        debug!(
            ssid = %self.ssid,
            timeout_ms = timeout.as_millis() as u64,
            "Associating"
        );
        if !self.reachable.load(Ordering::SeqCst) {
            return false;
        }
        self.connected.store(true, Ordering::SeqCst);
        self.notify(LinkEvent::LinkUp);
        self.notify(LinkEvent::AddressAcquired);
        true
    }

    fn info(&self) -> LinkInfo {
        let ip = local_ip();
        LinkInfo {
            ssid: self.ssid.clone(),
            ip: ip.to_string(),
            rssi_dbm: -50,
            mac: "02:00:00:00:00:01".to_string(),
            gateway: gateway_of(ip).to_string(),
            dns: gateway_of(ip).to_string(),
        }
    }
}

/// Address the host would use for outbound traffic. No packet is sent.
fn local_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Conventional `.1` gateway of an IPv4 /24.
fn gateway_of(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) if !v4.is_loopback() => {
            let [a, b, c, _] = v4.octets();
            IpAddr::V4(Ipv4Addr::new(a, b, c, 1))
        }
        other => other,
    }
}

/// Restart by exiting with [`RESTART_EXIT_CODE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRestart;

impl Restart for ProcessRestart {
    fn restart(&self) {
        error!(code = RESTART_EXIT_CODE, "Device restart requested; exiting");
        std::process::exit(RESTART_EXIT_CODE);
    }
}

/// Host statistics read from `/proc` and `/sys` where available.
#[derive(Debug)]
pub struct HostSystemInfo {
    started: Instant,
    min_free: AtomicU64,
    reset_reason: String,
}

impl HostSystemInfo {
    /// Start counting uptime now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            min_free: AtomicU64::new(u64::MAX),
            reset_reason: "power-on".to_string(),
        }
    }
}

impl Default for HostSystemInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInfo for HostSystemInfo {
    fn snapshot(&self) -> SystemSnapshot {
        let free_heap = read_meminfo_kb("MemAvailable").map(|kb| kb * 1024);
        let min_free_heap = free_heap.map(|free| {
            let previous = self.min_free.fetch_min(free, Ordering::SeqCst);
            previous.min(free)
        });
        SystemSnapshot {
            uptime: self.started.elapsed(),
            free_heap,
            min_free_heap,
            cpu_mhz: read_cpu_mhz(),
            sketch_size: current_image_size(),
            cpu_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            reset_reason: self.reset_reason.clone(),
            temperature_c: read_temperature_c(),
            ..SystemSnapshot::default()
        }
    }
}

fn current_image_size() -> Option<u64> {
    let exe = std::env::current_exe().ok()?;
    fs::metadata(exe).ok().map(|meta| meta.len())
}

fn read_meminfo_kb(key: &str) -> Option<u64> {
    let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_kb(&meminfo, key)
}

fn parse_meminfo_kb(meminfo: &str, key: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != key {
            return None;
        }
        rest.split_whitespace().next()?.parse().ok()
    })
}

fn read_cpu_mhz() -> Option<u32> {
    let cpuinfo = fs::read_to_string("/proc/cpuinfo").ok()?;
    cpuinfo.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim() != "cpu MHz" {
            return None;
        }
        value.trim().parse::<f64>().ok().map(|mhz| mhz.round() as u32)
    })
}

fn read_temperature_c() -> Option<f32> {
    let raw = fs::read_to_string("/sys/class/thermal/thermal_zone0/temp").ok()?;
    raw.trim()
        .parse::<f32>()
        .ok()
        .map(|millidegrees| millidegrees / 1000.0)
}
