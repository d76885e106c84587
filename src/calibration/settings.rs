//! # Calibration Settings
//!
//! User-adjustable corrections applied to every received frame.
//!
//! ## Direction offset
//!
//! Degrees added to the sensor direction to align it with the bow. Range
//! -180..=180.
//!
//! ## Speed factor
//!
//! Multiplier turning the selected base rate (pulses per second or
//! rotations per minute) into boat-speed units. Must lie strictly between
//! 0.0001 and 1000; anything else falls back to 1.0.
//!
//! ## Speed source
//!
//! Which sensor rate feeds the speed: pulse rate (default) or rotation rate.
//!
//! ## Channel
//!
//! Link channel the receiver listens on, 1..=13.
//!
//! ## Usage
//!
//! ```
//! use anemo_rx::calibration::settings::{CalibrationSettings, SpeedSource};
//!
//! let settings = CalibrationSettings {
//!     direction_offset_deg: 400,
//!     speed_factor: -1.0,
//!     speed_source: SpeedSource::RotationRate,
//!     channel: 0,
//! }
//! .sanitized();
//!
//! assert_eq!(settings.direction_offset_deg, 180);
//! assert_eq!(settings.speed_factor, 1.0);
//! assert_eq!(settings.channel, 1);
//! ```

use std::fmt;

/// Direction offset limits in degrees
pub const OFFSET_MIN_DEG: i16 = -180;
pub const OFFSET_MAX_DEG: i16 = 180;

/// Speed factor must be strictly above this
pub const FACTOR_MIN_EXCLUSIVE: f32 = 0.0001;
/// Speed factor must be strictly below this
pub const FACTOR_MAX_EXCLUSIVE: f32 = 1000.0;
/// Speed factor used when the stored one is unusable
pub const FACTOR_DEFAULT: f32 = 1.0;

/// Increment applied to the speed factor per button press
pub const FACTOR_STEP: f32 = 0.01;
/// Lowest factor reachable from the edit screen
pub const FACTOR_EDIT_MIN: f32 = 0.01;
/// Highest factor reachable from the edit screen
pub const FACTOR_EDIT_MAX: f32 = 999.99;

/// Channel limits
pub const CHANNEL_MIN: u8 = 1;
pub const CHANNEL_MAX: u8 = 13;

/// Which sensor rate drives the speed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedSource {
    /// Pulses per second
    #[default]
    PulseRate,
    /// Rotations per minute
    RotationRate,
}

impl SpeedSource {
    /// Decode the persisted code; unknown codes yield `None`
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::PulseRate),
            1 => Some(Self::RotationRate),
            _ => None,
        }
    }

    /// Persisted code for this source
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::PulseRate => 0,
            Self::RotationRate => 1,
        }
    }

    /// The other source
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::PulseRate => Self::RotationRate,
            Self::RotationRate => Self::PulseRate,
        }
    }

    /// Short label for the display
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PulseRate => "PPS",
            Self::RotationRate => "RPM",
        }
    }
}

impl fmt::Display for SpeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calibration parameters shared by the calculator and the edit screens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSettings {
    /// Degrees added to the sensor direction (-180..=180)
    pub direction_offset_deg: i16,
    /// Multiplier applied to the base rate (0.0001..1000 exclusive)
    pub speed_factor: f32,
    /// Which rate feeds the speed
    pub speed_source: SpeedSource,
    /// Link channel (1..=13)
    pub channel: u8,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            direction_offset_deg: 0,
            speed_factor: FACTOR_DEFAULT,
            speed_source: SpeedSource::PulseRate,
            channel: CHANNEL_MIN,
        }
    }
}

impl CalibrationSettings {
    /// Bring every field into its declared range
    ///
    /// Offset and channel are clamped; a factor outside its open range
    /// (or NaN) is replaced by the default rather than clamped.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            direction_offset_deg: self.direction_offset_deg.clamp(OFFSET_MIN_DEG, OFFSET_MAX_DEG),
            speed_factor: sanitize_factor(self.speed_factor),
            speed_source: self.speed_source,
            channel: self.channel.clamp(CHANNEL_MIN, CHANNEL_MAX),
        }
    }

    /// Whether every field already lies in range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.sanitized() == *self
    }

    /// Move the offset by `delta` degrees, saturating at the limits
    pub fn step_offset(&mut self, delta: i16) {
        self.direction_offset_deg = self
            .direction_offset_deg
            .saturating_add(delta)
            .clamp(OFFSET_MIN_DEG, OFFSET_MAX_DEG);
    }

    /// Move the factor by `steps` increments of [`FACTOR_STEP`]
    ///
    /// The result is rounded to two decimals so repeated presses do not
    /// accumulate float drift.
    pub fn step_factor(&mut self, steps: i32) {
        let next = self.speed_factor + steps as f32 * FACTOR_STEP;
        let rounded = (next * 100.0).round() / 100.0;
        self.speed_factor = rounded.clamp(FACTOR_EDIT_MIN, FACTOR_EDIT_MAX);
    }

    /// Switch between pulse rate and rotation rate
    pub fn toggle_source(&mut self) {
        self.speed_source = self.speed_source.toggled();
    }

    /// Move the channel by `delta`, saturating at the limits
    pub fn step_channel(&mut self, delta: i8) {
        let next = self.channel as i16 + delta as i16;
        self.channel = next.clamp(CHANNEL_MIN as i16, CHANNEL_MAX as i16) as u8;
    }
}

/// Replace an unusable speed factor with the default
#[must_use]
pub fn sanitize_factor(factor: f32) -> f32 {
    if factor > FACTOR_MIN_EXCLUSIVE && factor < FACTOR_MAX_EXCLUSIVE {
        factor
    } else {
        FACTOR_DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CalibrationSettings::default();
        assert_eq!(settings.direction_offset_deg, 0);
        assert_eq!(settings.speed_factor, 1.0);
        assert_eq!(settings.speed_source, SpeedSource::PulseRate);
        assert_eq!(settings.channel, 1);
        assert!(settings.is_valid());
    }

    #[test]
    fn test_speed_source_codes() {
        assert_eq!(SpeedSource::from_code(0), Some(SpeedSource::PulseRate));
        assert_eq!(SpeedSource::from_code(1), Some(SpeedSource::RotationRate));
        assert_eq!(SpeedSource::from_code(2), None);
        assert_eq!(SpeedSource::from_code(-1), None);
        assert_eq!(SpeedSource::PulseRate.code(), 0);
        assert_eq!(SpeedSource::RotationRate.code(), 1);
    }

    #[test]
    fn test_speed_source_toggle_and_label() {
        assert_eq!(SpeedSource::PulseRate.toggled(), SpeedSource::RotationRate);
        assert_eq!(SpeedSource::RotationRate.toggled(), SpeedSource::PulseRate);
        assert_eq!(SpeedSource::PulseRate.to_string(), "PPS");
        assert_eq!(SpeedSource::RotationRate.to_string(), "RPM");
    }

    #[test]
    fn test_sanitize_clamps_offset() {
        let s = CalibrationSettings { direction_offset_deg: -999, ..Default::default() }.sanitized();
        assert_eq!(s.direction_offset_deg, -180);

        let s = CalibrationSettings { direction_offset_deg: 181, ..Default::default() }.sanitized();
        assert_eq!(s.direction_offset_deg, 180);

        let s = CalibrationSettings { direction_offset_deg: -37, ..Default::default() }.sanitized();
        assert_eq!(s.direction_offset_deg, -37);
    }

    #[test]
    fn test_sanitize_factor_defaults_out_of_range() {
        for bad in [0.0, -2.5, 0.0001, 1000.0, 5000.0, f32::NAN, f32::INFINITY] {
            assert_eq!(sanitize_factor(bad), 1.0, "factor {} should default", bad);
        }
        for good in [0.00011, 0.5, 2.5, 999.9] {
            assert_eq!(sanitize_factor(good), good);
        }
    }

    #[test]
    fn test_sanitize_clamps_channel() {
        let s = CalibrationSettings { channel: 0, ..Default::default() }.sanitized();
        assert_eq!(s.channel, 1);

        let s = CalibrationSettings { channel: 14, ..Default::default() }.sanitized();
        assert_eq!(s.channel, 13);
    }

    #[test]
    fn test_step_offset_saturates() {
        let mut s = CalibrationSettings { direction_offset_deg: 179, ..Default::default() };
        s.step_offset(1);
        assert_eq!(s.direction_offset_deg, 180);
        s.step_offset(1);
        assert_eq!(s.direction_offset_deg, 180);

        s.direction_offset_deg = -180;
        s.step_offset(-1);
        assert_eq!(s.direction_offset_deg, -180);
    }

    #[test]
    fn test_step_factor_has_no_drift() {
        let mut s = CalibrationSettings::default();
        for _ in 0..150 {
            s.step_factor(1);
        }
        assert_eq!(s.speed_factor, 2.5);

        for _ in 0..150 {
            s.step_factor(-1);
        }
        assert_eq!(s.speed_factor, 1.0);
    }

    #[test]
    fn test_step_factor_bounds() {
        let mut s = CalibrationSettings { speed_factor: 0.01, ..Default::default() };
        s.step_factor(-1);
        assert_eq!(s.speed_factor, 0.01);

        s.speed_factor = 999.99;
        s.step_factor(1);
        assert_eq!(s.speed_factor, 999.99);
        assert!(s.is_valid());
    }

    #[test]
    fn test_step_channel_bounds() {
        let mut s = CalibrationSettings::default();
        s.step_channel(-1);
        assert_eq!(s.channel, 1);

        s.channel = 12;
        s.step_channel(1);
        s.step_channel(1);
        assert_eq!(s.channel, 13);
    }

    #[test]
    fn test_toggle_source() {
        let mut s = CalibrationSettings::default();
        s.toggle_source();
        assert_eq!(s.speed_source, SpeedSource::RotationRate);
        s.toggle_source();
        assert_eq!(s.speed_source, SpeedSource::PulseRate);
    }
}
