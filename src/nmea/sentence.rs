//! # NMEA 0183 Sentences
//!
//! Checksum, validation and the `MWV` (wind speed and angle) sentence.
//!
//! ## Sentence Layout
//!
//! ```text
//! $WIMWV,045,R,12.3,N,A*hh<CR><LF>
//!  |     |   | |    | |  |
//!  |     |   | |    | |  └─ XOR of every byte between '$' and '*', two hex digits
//!  |     |   | |    | └─ status: A = valid, V = invalid
//!  |     |   | |    └─ speed unit (knots)
//!  |     |   | └─ speed, one decimal
//!  |     |   └─ reference: R = relative to the bow
//!  |     └─ wind angle, whole degrees, zero padded
//!  └─ talker + sentence id
//! ```

use crate::measurement::normalize_degrees;

/// Longest line accepted from the inbound side, excluding CR/LF
pub const MAX_LINE_LEN: usize = 95;

/// Prefix of the proprietary sentences this receiver recognises
pub const PROPRIETARY_PREFIX: &str = "$PANA,";

/// XOR of all bytes of a sentence body (the part between `$` and `*`)
///
/// # Examples
///
/// ```
/// use anemo_rx::nmea::sentence::checksum;
///
/// assert_eq!(checksum(b"GPGLL,5300.97914,N,00259.98174,E,125926,A"), 0x28);
/// ```
#[must_use]
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |cs, b| cs ^ b)
}

/// Whether a line is a well-formed sentence with a matching checksum
///
/// The line must start with `$`, carry `*` at index 2 or later, and be
/// followed by two hex digits (either case) equal to the body checksum.
/// Anything after those two digits is ignored.
#[must_use]
pub fn validate_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    if bytes.first() != Some(&b'$') {
        return false;
    }

    let Some(star) = bytes.iter().position(|&b| b == b'*') else {
        return false;
    };
    if star < 2 {
        return false;
    }

    let Some(digits) = line.get(star + 1..star + 3) else {
        return false;
    };
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    match u8::from_str_radix(digits, 16) {
        Ok(carried) => carried == checksum(&bytes[1..star]),
        Err(_) => false,
    }
}

/// Format a complete `MWV` sentence including checksum and CR/LF
///
/// The direction is normalized and rounded to whole degrees, with a value
/// rounding up to 360 sent as 000. Negative or non-finite speeds are sent
/// as 0.0.
///
/// # Examples
///
/// ```
/// use anemo_rx::nmea::sentence::{format_mwv, validate_line};
///
/// let line = format_mwv("WI", 45.2, 12.34, true);
/// assert!(line.starts_with("$WIMWV,045,R,12.3,N,A*"));
/// assert!(line.ends_with("\r\n"));
/// assert!(validate_line(line.trim_end()));
/// ```
#[must_use]
pub fn format_mwv(talker: &str, direction_deg: f32, speed: f32, valid: bool) -> String {
    let mut angle = normalize_degrees(direction_deg).round() as u16;
    if angle >= 360 {
        angle = 0;
    }

    let speed = if speed.is_finite() && speed >= 0.0 { speed } else { 0.0 };
    let status = if valid { 'A' } else { 'V' };

    let body = format!("{}MWV,{:03},R,{:.1},N,{}", talker, angle, speed, status);
    format!("${}*{:02X}\r\n", body, checksum(body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(line: &str) -> &str {
        let start = line.find('$').unwrap() + 1;
        let end = line.find('*').unwrap();
        &line[start..end]
    }

    #[test]
    fn test_checksum_known_sentence() {
        assert_eq!(checksum(b"GPGLL,5300.97914,N,00259.98174,E,125926,A"), 0x28);
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn test_validate_accepts_good_lines() {
        assert!(validate_line("$GPGLL,5300.97914,N,00259.98174,E,125926,A*28"));
        assert!(validate_line("$GPGLL,5300.97914,N,00259.98174,E,125926,A*28 trailing"));

        let cs = checksum(b"PANA,CH,3");
        assert!(validate_line(&format!("$PANA,CH,3*{:02x}", cs)));
    }

    #[test]
    fn test_validate_rejects_bad_lines() {
        assert!(!validate_line(""));
        assert!(!validate_line("GPGLL,5300.97914,N,00259.98174,E,125926,A*28"));
        assert!(!validate_line("$GPGLL,5300.97914,N,00259.98174,E,125926,A*29"));
        assert!(!validate_line("$GPGLL,5300.97914,N,00259.98174,E,125926,A"));
        assert!(!validate_line("$GPGLL,5300.97914,N,00259.98174,E,125926,A*2"));
        assert!(!validate_line("$GPGLL,5300.97914,N,00259.98174,E,125926,A*ZZ"));
        // '*' too early
        assert!(!validate_line("$*00"));
    }

    #[test]
    fn test_validate_minimal_body() {
        let cs = checksum(b"A");
        assert!(validate_line(&format!("$A*{:02X}", cs)));
    }

    #[test]
    fn test_mwv_format() {
        let line = format_mwv("WI", 7.0, 3.26, true);
        assert!(line.starts_with("$WIMWV,007,R,3.3,N,A*"), "got {}", line);
        assert!(line.ends_with("\r\n"));

        let cs = checksum(body_of(&line).as_bytes());
        assert!(line.contains(&format!("*{:02X}\r\n", cs)));
    }

    #[test]
    fn test_mwv_invalid_status() {
        let line = format_mwv("WI", 180.0, 0.0, false);
        assert!(line.starts_with("$WIMWV,180,R,0.0,N,V*"));
    }

    #[test]
    fn test_mwv_direction_rounding_wraps() {
        assert!(format_mwv("WI", 359.6, 1.0, true).starts_with("$WIMWV,000,"));
        assert!(format_mwv("WI", 359.4, 1.0, true).starts_with("$WIMWV,359,"));
        assert!(format_mwv("WI", -90.0, 1.0, true).starts_with("$WIMWV,270,"));
        assert!(format_mwv("WI", 725.0, 1.0, true).starts_with("$WIMWV,005,"));
        assert!(format_mwv("WI", f32::NAN, 1.0, true).starts_with("$WIMWV,000,"));
    }

    #[test]
    fn test_mwv_speed_sanitized() {
        assert!(format_mwv("WI", 0.0, -4.0, true).contains(",R,0.0,N,"));
        assert!(format_mwv("WI", 0.0, f32::INFINITY, true).contains(",R,0.0,N,"));
        assert!(format_mwv("WI", 0.0, f32::NAN, true).contains(",R,0.0,N,"));
    }

    #[test]
    fn test_mwv_talker() {
        let line = format_mwv("II", 10.0, 1.0, true);
        assert!(line.starts_with("$IIMWV,010,"));
        assert!(validate_line(line.trim_end()));
    }
}
