//! # Wind Frame Decoder
//!
//! Validates and decodes a received datagram into a [`WindFrame`].
//!
//! Checks run in a fixed order and stop at the first failure:
//! length, then magic/version, then checksum. Nothing is returned for a
//! frame that fails any of them.

use thiserror::Error;

use super::crc::crc16_modbus;
use super::protocol::*;

/// Why a received datagram was not accepted as a wind frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameRejection {
    /// Datagram is not exactly [`WIND_FRAME_SIZE`] bytes
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Magic or version field does not match this protocol
    #[error("bad magic/version: magic 0x{magic:04X}, version {version}")]
    BadMagic { magic: u16, version: u16 },

    /// Trailing checksum does not match the computed CRC16/Modbus
    #[error("CRC mismatch: computed 0x{computed:04X}, carried 0x{carried:04X}")]
    BadChecksum { computed: u16, carried: u16 },
}

/// Decode a complete wind frame
///
/// # Arguments
///
/// * `data` - Raw datagram bytes as delivered by the link
///
/// # Returns
///
/// * `Result<WindFrame, FrameRejection>` - Decoded frame, or the first failed check
///
/// # Examples
///
/// ```
/// use anemo_rx::wind::decoder::{decode_frame, FrameRejection};
///
/// let result = decode_frame(&[0u8; 10]);
/// assert_eq!(result, Err(FrameRejection::LengthMismatch { expected: 28, actual: 10 }));
/// ```
pub fn decode_frame(data: &[u8]) -> Result<WindFrame, FrameRejection> {
    if data.len() != WIND_FRAME_SIZE {
        return Err(FrameRejection::LengthMismatch {
            expected: WIND_FRAME_SIZE,
            actual: data.len(),
        });
    }

    let magic = read_u16(data, 0);
    let version = read_u16(data, 2);
    if magic != WIND_MAGIC || version != WIND_VERSION {
        return Err(FrameRejection::BadMagic { magic, version });
    }

    let computed = crc16_modbus(&data[..WIND_CRC_COVERAGE]);
    let carried = read_u16(data, WIND_CRC_COVERAGE);
    if computed != carried {
        return Err(FrameRejection::BadChecksum { computed, carried });
    }

    Ok(WindFrame {
        magic,
        version,
        seq: read_u32(data, 4),
        timestamp_ms: read_u32(data, 8),
        raw_angle: read_u16(data, 12),
        angle_cdeg: read_u16(data, 14),
        pps_centi: read_u16(data, 16),
        rpm_centi: read_u16(data, 18),
        vbat_mv: read_u16(data, 20),
        status: read_u16(data, 22),
        i2c_err_count: read_u16(data, 24),
        crc16: carried,
    })
}

#[inline]
fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

#[inline]
fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
