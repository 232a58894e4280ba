//! # Serial Communication Module
//!
//! Handles the serial link to the measurement device.
//!
//! This module handles:
//! - Opening the configured serial port (8N1, no flow control)
//! - Handing the read half to the ingestion loop as a [`ByteStream`]
//!
//! Reconnection is not attempted here: a failed open or a runtime error ends
//! ingestion and is surfaced to the operator.

pub mod port_trait;

use tokio_serial::SerialPortBuilderExt;
use tracing::debug;

use crate::config::SerialConfig;
use crate::error::{MeterBridgeError, Result};

pub use port_trait::{ByteStream, PortOpener};

/// Default baud rate used by the meter firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device path
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM4";

/// Default device path
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Opens a real serial device through `tokio-serial`
#[derive(Debug, Clone)]
pub struct TokioSerialOpener {
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
    baud_rate: u32,
}

impl TokioSerialOpener {
    pub fn new(device_path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device_path: device_path.into(),
            baud_rate,
        }
    }

    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(config.port.clone(), config.baud_rate)
    }

    /// Get the device path this opener targets
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl PortOpener for TokioSerialOpener {
    fn open(&self) -> Result<Box<dyn ByteStream>> {
        debug!("Opening serial port {} at {} baud", self.device_path, self.baud_rate);
        let port = open_port(&self.device_path, self.baud_rate)?;
        Ok(Box::new(port))
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.device_path, self.baud_rate)
    }
}

/// Open a specific serial port with 8N1 settings
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyUSB0" or "COM4")
/// * `baud_rate` - Line speed
///
/// # Errors
///
/// Returns [`MeterBridgeError::SerialOpen`] naming the path on failure
pub fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| MeterBridgeError::SerialOpen(format!("Failed to open {}: {}", path, e)))
}
