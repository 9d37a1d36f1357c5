//! PMD-USB wire protocol: command bytes and response frame decoding.
//!
//! The device speaks a single-byte command protocol over USB serial. Every
//! command is answered by a fixed-length binary frame; there is no framing
//! or checksumming beyond the known response lengths.

use crate::errors::{DriverError, Result};
use crate::types::{Rail, Reading};

// ============================================================================
// Commands
// ============================================================================

/// Single-byte request commands understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Welcome,
    Identity,
    SensorStruct,
    ReadValues,
    ReadConfig,
    ReadAdcBuffer,
}

impl Command {
    /// Wire byte for this command. Pure mapping, no failure.
    pub fn byte(self) -> u8 {
        match self {
            Command::Welcome => 0x00,
            Command::Identity => 0x01,
            Command::SensorStruct => 0x02,
            Command::ReadValues => 0x03,
            Command::ReadConfig => 0x04,
            Command::ReadAdcBuffer => 0x06,
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Length of the welcome response.
pub const WELCOME_LEN: usize = 18;

/// Expected welcome response: the device identity string, NUL-terminated
/// on the wire to fill the 18-byte frame.
pub const WELCOME_FRAME: &[u8; WELCOME_LEN] = b"ElmorLabs PMD-USB\0";

/// Length of a values response: 4 rails x (u16 voltage, u16 current).
pub const VALUES_LEN: usize = 16;

/// Volts per raw voltage unit.
const VOLTAGE_SCALE: f64 = 0.01;

/// Amps per raw current unit.
const CURRENT_SCALE: f64 = 0.1;

/// Validate a welcome frame against the device identity string.
pub fn decode_welcome(bytes: &[u8]) -> Result<()> {
    if bytes.len() != WELCOME_LEN {
        return Err(DriverError::Handshake(format!(
            "welcome frame was {} bytes, expected {}",
            bytes.len(),
            WELCOME_LEN
        )));
    }
    if bytes != WELCOME_FRAME.as_slice() {
        return Err(DriverError::Handshake(format!(
            "unexpected identity bytes: {:02X?}",
            bytes
        )));
    }
    Ok(())
}

/// Decode a values frame into one reading per rail, in wire order.
///
/// Each rail occupies 4 bytes: voltage as u16 little-endian in 10 mV units,
/// then current as u16 little-endian in 100 mA units. Power is derived from
/// the scaled voltage and current, never from the raw integers.
pub fn decode_values(bytes: &[u8]) -> Result<[Reading; 4]> {
    if bytes.len() != VALUES_LEN {
        return Err(DriverError::FrameLength {
            expected: VALUES_LEN,
            actual: bytes.len(),
        });
    }

    Ok(std::array::from_fn(|i| {
        let off = i * 4;
        let raw_voltage = u16::from_le_bytes([bytes[off], bytes[off + 1]]);
        let raw_current = u16::from_le_bytes([bytes[off + 2], bytes[off + 3]]);
        Reading::from_scaled(
            Rail::ALL[i],
            f64::from(raw_voltage) * VOLTAGE_SCALE,
            f64::from(raw_current) * CURRENT_SCALE,
        )
    }))
}
