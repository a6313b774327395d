//! # CAN Bus Module
//!
//! Serial communication with an SLCAN (Lawicel) USB CAN adapter.
//!
//! This module handles:
//! - Opening the adapter serial port and configuring the CAN channel
//! - Non-blocking frame transmission for the cooperative publisher loop
//! - Draining short writes so commands never interleave on the wire

pub mod sink;

use bytes::{Buf, BytesMut};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::can::protocol::CanFrame;
use crate::can::slcan::{encode_bitrate_command, encode_transmit_command, SLCAN_CLOSE, SLCAN_OPEN};
use crate::error::{EnviroBridgeError, Result};
use sink::FrameSink;

/// Default serial baud rate for SLCAN USB adapters
pub const SLCAN_BAUD_RATE: u32 = 115_200;

/// Default adapter device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC adapters (most common)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// SLCAN adapter handle
///
/// Owns the serial port and the tail of any short write; a command that was
/// only partially accepted is finished before the next one starts.
pub struct SlcanBus {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
    /// Unwritten tail of the last partially-written command
    pending: BytesMut,
}

impl std::fmt::Debug for SlcanBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlcanBus")
            .field("device_path", &self.device_path)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl SlcanBus {
    /// Open an SLCAN adapter, auto-detecting the device path
    ///
    /// # Arguments
    ///
    /// * `bitrate` - CAN bus bitrate in bit/s (Lawicel `S0`-`S8` table)
    ///
    /// # Errors
    ///
    /// Returns error if no adapter is found or channel setup fails
    pub async fn open(bitrate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, SLCAN_BAUD_RATE, bitrate).await
    }

    /// Open an SLCAN adapter at one of the given device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Serial baud rate of the adapter
    /// * `bitrate` - CAN bus bitrate in bit/s
    pub async fn open_with_paths(paths: &[&str], baud_rate: u32, bitrate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open CAN adapter: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    let mut bus = Self {
                        port,
                        device_path: path.to_string(),
                        pending: BytesMut::new(),
                    };
                    bus.configure_channel(bitrate).await?;
                    info!("Opened CAN adapter at {} ({} bit/s)", path, bitrate);
                    return Ok(bus);
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(EnviroBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with adapter settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| EnviroBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Configure and open the CAN channel
    ///
    /// Closes any channel a previous session left open, selects the bitrate,
    /// then opens the channel.
    async fn configure_channel(&mut self, bitrate: u32) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let setup = encode_bitrate_command(bitrate)?;

        for command in [SLCAN_CLOSE, setup.as_slice(), SLCAN_OPEN] {
            self.port
                .write_all(command)
                .await
                .map_err(|e| EnviroBridgeError::Serial(format!("Channel setup failed: {}", e)))?;
        }

        self.port
            .flush()
            .await
            .map_err(|e| EnviroBridgeError::Serial(format!("Channel setup failed: {}", e)))?;

        Ok(())
    }

    /// Get the device path of the opened adapter
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Finish writing any partially-written command
    ///
    /// Returns `true` once nothing is pending.
    fn drain_pending(&mut self) -> bool {
        while !self.pending.is_empty() {
            match self.port.try_write(&self.pending) {
                Ok(0) => return false,
                Ok(n) => self.pending.advance(n),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return false,
                Err(e) => {
                    warn!("CAN adapter write failed: {}", e);
                    return false;
                }
            }
        }

        true
    }
}

impl FrameSink for SlcanBus {
    /// Queue one frame without blocking
    ///
    /// A short write still counts as accepted: the unwritten tail is stored
    /// and drained before the next command, keeping the ASCII stream intact.
    fn try_send(&mut self, frame: &CanFrame) -> bool {
        if !self.drain_pending() {
            return false;
        }

        let command = encode_transmit_command(frame);

        match self.port.try_write(&command) {
            Ok(n) if n == command.len() => {
                debug!("Sent frame id={} len={}", frame.id, frame.len);
                true
            }
            Ok(n) => {
                self.pending.extend_from_slice(&command[n..]);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!("CAN adapter write failed: {}", e);
                false
            }
        }
    }
}
