//! # Wind Frame Encoder
//!
//! Serializes a [`WindFrame`] into its 28-byte wire form. The receiver never
//! transmits; this is what the simulator and the tests use to produce frames.

use super::crc::crc16_modbus;
use super::protocol::*;

/// Encode a wind frame into wire bytes
///
/// The `crc16` field of `frame` is ignored; the checksum is recomputed over
/// the first 26 bytes so the output always validates.
///
/// # Examples
///
/// ```
/// use anemo_rx::wind::encoder::encode_frame;
/// use anemo_rx::wind::protocol::{WindFrame, WIND_MAGIC, WIND_VERSION};
///
/// let frame = WindFrame { magic: WIND_MAGIC, version: WIND_VERSION, seq: 1, ..Default::default() };
/// let bytes = encode_frame(&frame);
/// assert_eq!(bytes.len(), 28);
/// ```
pub fn encode_frame(frame: &WindFrame) -> [u8; WIND_FRAME_SIZE] {
    let mut out = encode_fields(frame);
    let crc = crc16_modbus(&out[..WIND_CRC_COVERAGE]);
    out[WIND_CRC_COVERAGE..].copy_from_slice(&crc.to_le_bytes());
    out
}

/// Encode a frame as produced by a live sensor with the given readings
///
/// Fills magic and version with the protocol constants.
pub fn encode_reading(
    seq: u32,
    timestamp_ms: u32,
    angle_cdeg: u16,
    pps_centi: u16,
    rpm_centi: u16,
    status: u16,
) -> [u8; WIND_FRAME_SIZE] {
    let raw_angle = ((angle_cdeg as u32 * RAW_ANGLE_COUNTS as u32) / 36_000) as u16;

    encode_frame(&WindFrame {
        magic: WIND_MAGIC,
        version: WIND_VERSION,
        seq,
        timestamp_ms,
        raw_angle,
        angle_cdeg,
        pps_centi,
        rpm_centi,
        vbat_mv: 0,
        status,
        i2c_err_count: 0,
        crc16: 0,
    })
}

/// Lay out every field except the checksum
fn encode_fields(frame: &WindFrame) -> [u8; WIND_FRAME_SIZE] {
    let mut out = [0u8; WIND_FRAME_SIZE];

    out[0..2].copy_from_slice(&frame.magic.to_le_bytes());
    out[2..4].copy_from_slice(&frame.version.to_le_bytes());
    out[4..8].copy_from_slice(&frame.seq.to_le_bytes());
    out[8..12].copy_from_slice(&frame.timestamp_ms.to_le_bytes());
    out[12..14].copy_from_slice(&frame.raw_angle.to_le_bytes());
    out[14..16].copy_from_slice(&frame.angle_cdeg.to_le_bytes());
    out[16..18].copy_from_slice(&frame.pps_centi.to_le_bytes());
    out[18..20].copy_from_slice(&frame.rpm_centi.to_le_bytes());
    out[20..22].copy_from_slice(&frame.vbat_mv.to_le_bytes());
    out[22..24].copy_from_slice(&frame.status.to_le_bytes());
    out[24..26].copy_from_slice(&frame.i2c_err_count.to_le_bytes());

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_header_bytes() {
        let bytes = encode_reading(0x0102_0304, 0, 0, 0, 0, 0);

        // Magic 0x574E little-endian, version 1
        assert_eq!(&bytes[0..4], &[0x4E, 0x57, 0x01, 0x00]);
        // Sequence little-endian
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_encode_frame_field_offsets() {
        let frame = WindFrame {
            magic: WIND_MAGIC,
            version: WIND_VERSION,
            seq: 7,
            timestamp_ms: 123_456,
            raw_angle: 4095,
            angle_cdeg: 35_999,
            pps_centi: 1234,
            rpm_centi: 5678,
            vbat_mv: 3700,
            status: STATUS_DIRECTION_VALID,
            i2c_err_count: 3,
            crc16: 0,
        };
        let bytes = encode_frame(&frame);

        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 4095);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 35_999);
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 3700);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 0x0002);
        assert_eq!(u16::from_le_bytes([bytes[24], bytes[25]]), 3);
    }

    #[test]
    fn test_encode_frame_trailing_crc() {
        let bytes = encode_reading(42, 1000, 18_000, 250, 600, STATUS_DIRECTION_VALID);
        let carried = u16::from_le_bytes([bytes[26], bytes[27]]);
        assert_eq!(carried, crc16_modbus(&bytes[..26]));
    }

    #[test]
    fn test_encode_frame_ignores_stale_crc_field() {
        let mut frame = WindFrame {
            magic: WIND_MAGIC,
            version: WIND_VERSION,
            ..Default::default()
        };
        let a = encode_frame(&frame);
        frame.crc16 = 0xDEAD;
        let b = encode_frame(&frame);
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_reading_raw_angle_scaling() {
        let bytes = encode_reading(0, 0, 18_000, 0, 0, 0);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 2048);
    }
}
