//! # Outbound NMEA
//!
//! Paces `MWV` sentences to a fixed period and keeps the last good reading,
//! so a stale link still yields a sentence (with status `V`) carrying the
//! previous values.

use std::time::{Duration, Instant};

use tracing::debug;

use super::sentence::format_mwv;

/// Default output period
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);

/// Default talker id
pub const DEFAULT_TALKER: &str = "WI";

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub enabled: bool,
    pub period: Duration,
    pub talker: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: DEFAULT_PERIOD,
            talker: DEFAULT_TALKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Reading {
    direction_deg: f32,
    speed: f32,
}

/// `MWV` pacing and last-good hold
#[derive(Debug, Clone)]
pub struct NmeaOutput {
    config: OutputConfig,
    last_sent: Instant,
    last_good: Reading,
}

impl NmeaOutput {
    /// The first sentence goes out one period after `now`
    #[must_use]
    pub fn new(config: OutputConfig, now: Instant) -> Self {
        Self {
            config,
            last_sent: now,
            last_good: Reading::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Remember a reading computed from a fresh frame
    pub fn record(&mut self, direction_deg: f32, speed: f32) {
        self.last_good = Reading { direction_deg, speed };
    }

    /// Produce a sentence if enabled and the period has elapsed
    ///
    /// `valid` marks the sentence `A`; the caller passes link freshness
    /// combined with the direction-valid flag.
    pub fn tick(&mut self, now: Instant, valid: bool) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        if now.saturating_duration_since(self.last_sent) < self.config.period {
            return None;
        }
        self.last_sent = now;

        let line = format_mwv(
            &self.config.talker,
            self.last_good.direction_deg,
            self.last_good.speed,
            valid,
        );
        debug!("NMEA out: {}", line.trim_end());
        Some(line)
    }
}
