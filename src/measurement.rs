//! # Derived Measurements
//!
//! Turns a raw [`WindFrame`] into calibrated direction and speed.
//!
//! Direction validity is not judged here. Callers combine link freshness with
//! [`WindFrame::direction_valid`] to decide whether a direction is shown.

use crate::calibration::settings::{CalibrationSettings, SpeedSource};
use crate::wind::protocol::{WindFrame, RAW_ANGLE_COUNTS};

/// Calibrated values derived from one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindMeasurement {
    /// Direction after offset, in [0, 360)
    pub direction_deg: f32,
    /// Base rate times speed factor
    pub speed: f32,
    /// Direction straight from the 12-bit sensor, in [0, 360)
    pub raw_direction_deg: f32,
    /// Pulses per second
    pub pps: f32,
    /// Rotations per minute
    pub rpm: f32,
}

/// Apply calibration to a frame
///
/// # Examples
///
/// ```
/// use anemo_rx::calibration::settings::CalibrationSettings;
/// use anemo_rx::measurement::derive;
/// use anemo_rx::wind::protocol::WindFrame;
///
/// let frame = WindFrame { angle_cdeg: 35_900, pps_centi: 250, ..Default::default() };
/// let settings = CalibrationSettings { direction_offset_deg: 5, ..Default::default() };
///
/// let m = derive(&frame, &settings);
/// assert!((m.direction_deg - 4.0).abs() < 1e-3);
/// assert!((m.speed - 2.5).abs() < 1e-6);
/// ```
#[must_use]
pub fn derive(frame: &WindFrame, settings: &CalibrationSettings) -> WindMeasurement {
    let sensor_deg = frame.angle_cdeg as f32 / 100.0;
    let direction_deg = normalize_degrees(sensor_deg + settings.direction_offset_deg as f32);

    let pps = frame.pps_centi as f32 / 100.0;
    let rpm = frame.rpm_centi as f32 / 100.0;
    let base = match settings.speed_source {
        SpeedSource::PulseRate => pps,
        SpeedSource::RotationRate => rpm,
    };

    WindMeasurement {
        direction_deg,
        speed: base * settings.speed_factor,
        raw_direction_deg: frame.raw_angle as f32 * 360.0 / RAW_ANGLE_COUNTS as f32,
        pps,
        rpm,
    }
}

/// Bring an angle into [0, 360) by whole turns
///
/// Uses repeated addition/subtraction rather than a remainder so that values
/// already in range come back bit-for-bit unchanged. Non-finite input maps
/// to 0.
///
/// # Examples
///
/// ```
/// use anemo_rx::measurement::normalize_degrees;
///
/// assert_eq!(normalize_degrees(364.0), 4.0);
/// assert_eq!(normalize_degrees(-90.0), 270.0);
/// assert_eq!(normalize_degrees(360.0), 0.0);
/// ```
#[must_use]
pub fn normalize_degrees(mut deg: f32) -> f32 {
    if !deg.is_finite() {
        return 0.0;
    }

    // Far-out values would take many loop turns; a remainder lands them near range first
    if deg.abs() > 3600.0 {
        deg %= 360.0;
    }

    while deg < 0.0 {
        deg += 360.0;
    }
    while deg >= 360.0 {
        deg -= 360.0;
    }
    deg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(angle_cdeg: u16, pps_centi: u16, rpm_centi: u16) -> WindFrame {
        WindFrame {
            angle_cdeg,
            pps_centi,
            rpm_centi,
            ..Default::default()
        }
    }

    #[test]
    fn test_offset_wraps_past_north() {
        let settings = CalibrationSettings { direction_offset_deg: 5, ..Default::default() };
        let m = derive(&frame(35_900, 0, 0), &settings);
        assert!((m.direction_deg - 4.0).abs() < 1e-3, "got {}", m.direction_deg);
    }

    #[test]
    fn test_negative_offset_wraps_below_zero() {
        let settings = CalibrationSettings { direction_offset_deg: -180, ..Default::default() };
        let m = derive(&frame(9_000, 0, 0), &settings);
        assert!((m.direction_deg - 270.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_offset_passes_through() {
        let m = derive(&frame(12_345, 0, 0), &CalibrationSettings::default());
        assert!((m.direction_deg - 123.45).abs() < 1e-3);
    }

    #[test]
    fn test_direction_always_in_range() {
        for offset in [-180i16, -1, 0, 1, 180] {
            let settings = CalibrationSettings { direction_offset_deg: offset, ..Default::default() };
            for cdeg in (0u16..36_000).step_by(250).chain([35_999]) {
                let d = derive(&frame(cdeg, 0, 0), &settings).direction_deg;
                assert!((0.0..360.0).contains(&d), "offset {} cdeg {} -> {}", offset, cdeg, d);
            }
        }
    }

    #[test]
    fn test_speed_from_pulse_rate() {
        let settings = CalibrationSettings { speed_factor: 2.0, ..Default::default() };
        let m = derive(&frame(0, 1250, 9900), &settings);
        assert!((m.speed - 25.0).abs() < 1e-4);
        assert!((m.pps - 12.5).abs() < 1e-6);
        assert!((m.rpm - 99.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_from_rotation_rate() {
        let settings = CalibrationSettings {
            speed_factor: 0.5,
            speed_source: SpeedSource::RotationRate,
            ..Default::default()
        };
        let m = derive(&frame(0, 1250, 9900), &settings);
        assert!((m.speed - 49.5).abs() < 1e-4);
    }

    #[test]
    fn test_raw_direction() {
        let f = WindFrame { raw_angle: 1024, ..Default::default() };
        let m = derive(&f, &CalibrationSettings::default());
        assert!((m.raw_direction_deg - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_matches_remainder_for_finite_inputs() {
        for deg in [-1079.5f32, -720.0, -360.0, -0.25, 0.0, 359.75, 360.0, 719.0, 1000.5] {
            let expected = deg.rem_euclid(360.0);
            assert!((normalize_degrees(deg) - expected).abs() < 1e-3, "deg {}", deg);
        }
    }

    #[test]
    fn test_normalize_non_finite() {
        assert_eq!(normalize_degrees(f32::NAN), 0.0);
        assert_eq!(normalize_degrees(f32::INFINITY), 0.0);
        assert_eq!(normalize_degrees(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_normalize_huge_values_terminate() {
        let d = normalize_degrees(1.0e9);
        assert!((0.0..360.0).contains(&d));
    }
}
