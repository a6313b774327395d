//! # SLCAN Command Encoder
//!
//! Encodes CAN frames into Lawicel SLCAN ASCII commands.
//!
//! **Transmit command**: `t` + 3 hex ID digits + 1 DLC digit + 2 hex digits
//! per data byte, terminated by `\r`. Only standard (11-bit) identifiers are
//! produced; the hex digits are uppercase.

use super::protocol::CanFrame;
use crate::error::{EnviroBridgeError, Result};

/// Command terminator for all SLCAN commands
pub const SLCAN_CR: u8 = b'\r';

/// Open-channel command (`O\r`)
pub const SLCAN_OPEN: &[u8] = b"O\r";

/// Close-channel command (`C\r`)
pub const SLCAN_CLOSE: &[u8] = b"C\r";

/// Supported bus bitrates, indexed by the `S<n>` setup command digit
const SLCAN_BITRATES: [u32; 9] = [
    10_000, 20_000, 50_000, 100_000, 125_000, 250_000, 500_000, 800_000, 1_000_000,
];

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Encode a frame into an SLCAN transmit command
///
/// # Arguments
///
/// * `frame` - Frame to encode (standard 11-bit identifier)
///
/// # Returns
///
/// * `Vec<u8>` - ASCII command bytes, e.g. `t04D40000AC41\r`
///
/// # Examples
///
/// ```
/// use enviro_bridge::can::protocol::CanFrame;
/// use enviro_bridge::can::slcan::encode_transmit_command;
///
/// let frame = CanFrame::from_value(77, 21.5f32);
/// let command = encode_transmit_command(&frame);
/// assert_eq!(command, b"t04D40000AC41\r");
/// ```
pub fn encode_transmit_command(frame: &CanFrame) -> Vec<u8> {
    // 't' + 3 ID digits + DLC digit + 2 digits per byte + CR
    let mut command = Vec::with_capacity(5 + 2 * frame.len as usize + 1);

    command.push(b't');
    command.push(HEX_DIGITS[(frame.id >> 8 & 0xF) as usize]);
    command.push(HEX_DIGITS[(frame.id >> 4 & 0xF) as usize]);
    command.push(HEX_DIGITS[(frame.id & 0xF) as usize]);
    command.push(b'0' + frame.len);

    for &byte in frame.payload() {
        command.push(HEX_DIGITS[(byte >> 4) as usize]);
        command.push(HEX_DIGITS[(byte & 0xF) as usize]);
    }

    command.push(SLCAN_CR);
    command
}

/// Encode the bitrate setup command for a supported bus bitrate
///
/// # Arguments
///
/// * `bitrate` - Bus bitrate in bit/s (one of the Lawicel `S0`-`S8` rates)
///
/// # Returns
///
/// * `Result<Vec<u8>>` - `S<n>\r` command, or error for unsupported rates
///
/// # Errors
///
/// Returns error if the bitrate is not in the SLCAN table
pub fn encode_bitrate_command(bitrate: u32) -> Result<Vec<u8>> {
    let index = SLCAN_BITRATES
        .iter()
        .position(|&rate| rate == bitrate)
        .ok_or_else(|| {
            EnviroBridgeError::CanProtocol(format!("Unsupported CAN bitrate: {}", bitrate))
        })?;

    Ok(vec![b'S', b'0' + index as u8, SLCAN_CR])
}

/// Whether a bitrate has an SLCAN setup command
pub fn is_supported_bitrate(bitrate: u32) -> bool {
    SLCAN_BITRATES.contains(&bitrate)
}
