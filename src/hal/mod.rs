//! Capability providers
//!
//! Narrow interfaces to the hardware and platform operations the core needs:
//! on/off actuators (LED, flash), frame capture, link status and reconnect,
//! restart, watchdog pulse, and system information. Tool handlers and the
//! connectivity supervisor only ever see these traits; [`sim`] holds the
//! host-side implementations used by the binary.

pub mod sim;
pub mod watchdog;

use std::sync::Arc;
use std::time::Duration;

use crate::error::HalError;

/// A binary on/off output such as the status LED or the flash lamp.
#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send + Sync {
    /// Drive the output on or off.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Actuation`] if the output cannot be driven.
    fn set(&self, on: bool) -> Result<(), HalError>;

    /// Switch on, hold for `duration`, switch off.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Actuation`] if either edge fails.
    fn pulse(&self, duration: Duration) -> Result<(), HalError> {
        self.set(true)?;
        std::thread::sleep(duration);
        self.set(false)
    }
}

/// The frame-buffer acquisition primitive.
#[cfg_attr(test, mockall::automock)]
pub trait Camera: Send + Sync {
    /// Outcome of sensor initialization at boot.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::CameraUnavailable`] if the sensor never came up.
    fn init_status(&self) -> Result<(), HalError>;

    /// Acquire one frame and return its encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::CaptureFailed`] if no frame buffer was obtained.
    fn capture(&self) -> Result<Vec<u8>, HalError>;
}

/// Addressing details of the current network association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    /// Network name of the association.
    pub ssid: String,
    /// Local IPv4 address.
    pub ip: String,
    /// Received signal strength in dBm.
    pub rssi_dbm: i32,
    /// Station MAC address.
    pub mac: String,
    /// Default gateway.
    pub gateway: String,
    /// Primary DNS server.
    pub dns: String,
}

/// The network link: authoritative status plus the reconnect command.
#[cfg_attr(test, mockall::automock)]
pub trait Link: Send + Sync {
    /// Whether the link is associated and has an address.
    fn is_connected(&self) -> bool;

    /// Drop the current association, re-begin with the persisted
    /// credentials and wait up to `timeout` for the link to come up.
    ///
    /// Returns `true` if the link is connected when the call returns.
    fn reconnect(&self, timeout: Duration) -> bool;

    /// Addressing details of the current association.
    fn info(&self) -> LinkInfo;
}

/// Full device restart.
#[cfg_attr(test, mockall::automock)]
pub trait Restart: Send + Sync {
    /// Reset the device. On hardware this never returns.
    fn restart(&self);
}

/// Liveness signal to an external fail-safe timer.
#[cfg_attr(test, mockall::automock)]
pub trait Watchdog: Send + Sync {
    /// Feed the watchdog.
    fn pulse(&self);
}

/// Point-in-time platform statistics for `system_status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSnapshot {
    /// Time since boot.
    pub uptime: Duration,
    /// Free heap in bytes, when the platform reports it.
    pub free_heap: Option<u64>,
    /// Low-water mark of free heap in bytes.
    pub min_free_heap: Option<u64>,
    /// Largest single allocation the heap can satisfy.
    pub max_alloc_heap: Option<u64>,
    /// CPU clock in MHz, when known.
    pub cpu_mhz: Option<u32>,
    /// Flash chip size in bytes.
    pub flash_size: Option<u64>,
    /// Flash chip clock in Hz.
    pub flash_speed_hz: Option<u32>,
    /// Size of the running firmware image in bytes.
    pub sketch_size: Option<u64>,
    /// Space left for a firmware update in bytes.
    pub free_sketch_space: Option<u64>,
    /// Vendor SDK version string.
    pub sdk_version: Option<String>,
    /// Number of CPU cores.
    pub cpu_cores: usize,
    /// Firmware version string.
    pub firmware_version: String,
    /// Why the device last reset.
    pub reset_reason: String,
    /// Internal temperature in degrees Celsius.
    pub temperature_c: Option<f32>,
}

/// Platform statistics provider.
#[cfg_attr(test, mockall::automock)]
pub trait SystemInfo: Send + Sync {
    /// Take a snapshot of the current statistics.
    fn snapshot(&self) -> SystemSnapshot;
}

/// Every capability provider the device wires into its core.
#[derive(Clone)]
pub struct Capabilities {
    /// Status LED.
    pub led: Arc<dyn Actuator>,
    /// Flash lamp.
    pub flash: Arc<dyn Actuator>,
    /// Camera sensor.
    pub camera: Arc<dyn Camera>,
    /// Network link.
    pub link: Arc<dyn Link>,
    /// Restart command.
    pub restart: Arc<dyn Restart>,
    /// Liveness watchdog.
    pub watchdog: Arc<dyn Watchdog>,
    /// Platform statistics.
    pub system: Arc<dyn SystemInfo>,
}
