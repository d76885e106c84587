//! # CRC16/Modbus Implementation
//!
//! CRC-16/Modbus checksum calculation for wind telemetry frames.
//!
//! **Polynomial**: 0xA001 (reflected form of 0x8005)
//! **Initial Value**: 0xFFFF
//! **Final XOR**: none

/// CRC-16/Modbus reflected polynomial
const CRC16_POLY: u16 = 0xA001;

/// CRC-16/Modbus initial register value
const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate CRC16/Modbus checksum using lookup table (fast)
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (every frame byte except the trailing CRC field)
///
/// # Returns
///
/// * `u16` - Calculated CRC16 checksum
///
/// # Examples
///
/// ```
/// use anemo_rx::wind::crc::crc16_modbus;
///
/// assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
/// ```
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0xFF) as usize];
    }

    crc
}

/// Calculate CRC16/Modbus checksum bit by bit (slow, for verification)
///
/// Each byte is folded into the register and shifted out eight times.
/// Used primarily for testing the lookup table implementation.
#[allow(dead_code)]
fn crc16_modbus_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty_is_init() {
        assert_eq!(crc16_modbus(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_check_value() {
        // Standard CRC-16/MODBUS check value
        assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
        assert_eq!(crc16_modbus_slow(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_crc16_modbus_rtu_vector() {
        // Read holding registers request: 01 03 00 00 00 0A -> CRC C5CD (sent low byte first)
        let request = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A];
        assert_eq!(crc16_modbus(&request), 0xCDC5);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0x4E, 0x57, 0x01, 0x00],
            vec![0x00; 26],
            vec![0xFF; 26],
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16_modbus(data),
                crc16_modbus_slow(data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc16_detects_every_single_bit_flip() {
        let data: Vec<u8> = (0u8..26).map(|b| b.wrapping_mul(37)).collect();
        let reference = crc16_modbus(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data.clone();
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    crc16_modbus(&corrupted),
                    reference,
                    "flip of byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }
}
