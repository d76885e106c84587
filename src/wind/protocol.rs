//! # Wind Frame Constants and Types
//!
//! Core definitions for the wind telemetry frame.
//!
//! ```text
//! offset  size  field
//!  0      2     magic          (0x574E, "WN")
//!  2      2     version        (1)
//!  4      4     seq
//!  8      4     timestamp_ms
//! 12      2     raw_angle      (0..4095)
//! 14      2     angle_cdeg     (0..35999)
//! 16      2     pps_centi
//! 18      2     rpm_centi
//! 20      2     vbat_mv
//! 22      2     status
//! 24      2     i2c_err_count
//! 26      2     crc16          (CRC16/Modbus over bytes 0..26)
//! ```
//!
//! All multi-byte fields are little-endian.

/// Protocol identifier carried in the first two bytes ("WN")
pub const WIND_MAGIC: u16 = 0x574E;

/// Only frame version this receiver understands
pub const WIND_VERSION: u16 = 1;

/// Exact size of a wind frame on the wire
pub const WIND_FRAME_SIZE: usize = 28;

/// Number of leading bytes covered by the checksum
pub const WIND_CRC_COVERAGE: usize = WIND_FRAME_SIZE - 2;

/// Status bit: direction sensor reading is valid
pub const STATUS_DIRECTION_VALID: u16 = 1 << 1;

/// Full-scale count of the raw angle sensor (12-bit)
pub const RAW_ANGLE_COUNTS: u16 = 4096;

/// One decoded wind telemetry frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindFrame {
    /// Protocol identifier, always [`WIND_MAGIC`] once decoded
    pub magic: u16,

    /// Protocol version, always [`WIND_VERSION`] once decoded
    pub version: u16,

    /// Per-sender monotonically increasing counter
    pub seq: u32,

    /// Sender-side uptime in ms (informational only)
    pub timestamp_ms: u32,

    /// Raw 12-bit angle sensor reading
    pub raw_angle: u16,

    /// Direction in centidegrees (0..35999)
    pub angle_cdeg: u16,

    /// Pulses per second ×100
    pub pps_centi: u16,

    /// Rotations per minute ×100
    pub rpm_centi: u16,

    /// Battery voltage in mV, 0 when the sender has no battery sense
    pub vbat_mv: u16,

    /// Status bit flags
    pub status: u16,

    /// Sender-side I2C error counter
    pub i2c_err_count: u16,

    /// Checksum as carried on the wire
    pub crc16: u16,
}

impl WindFrame {
    /// Whether the sender flagged the direction reading as valid (status bit 1)
    pub fn direction_valid(&self) -> bool {
        self.status & STATUS_DIRECTION_VALID != 0
    }

    /// Battery voltage in volts, `None` when not reported
    pub fn battery_volts(&self) -> Option<f32> {
        (self.vbat_mv != 0).then(|| self.vbat_mv as f32 / 1000.0)
    }
}
