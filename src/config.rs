//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every key is optional; anything left out takes its
//! default. A minimal file looks like:
//!
//! ```toml
//! [link]
//! base_port = 47000
//!
//! [nmea]
//! port = "/dev/ttyUSB0"
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{AnemoError, Result};
use crate::calibration::settings::{CHANNEL_MAX, CHANNEL_MIN};
use crate::nmea::output::OutputConfig;
use crate::serial::ALLOWED_BAUD_RATES;
use crate::ui::input::KeyMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub nmea: NmeaConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wind link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// UDP port of channel 1; channel N listens on `base_port + N - 1`
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

/// Display and button configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,

    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// evdev device; empty means auto-detect
    #[serde(default)]
    pub input_device: String,

    #[serde(default = "default_key_back")]
    pub key_back: u16,

    #[serde(default = "default_key_next")]
    pub key_next: u16,

    #[serde(default = "default_key_prev")]
    pub key_prev: u16,

    #[serde(default = "default_key_confirm")]
    pub key_confirm: u16,
}

/// NMEA 0183 configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NmeaConfig {
    #[serde(default = "default_enabled_out")]
    pub enabled_out: bool,

    #[serde(default)]
    pub enabled_in: bool,

    #[serde(default = "default_out_period_ms")]
    pub out_period_ms: u64,

    #[serde(default = "default_talker")]
    pub talker: String,

    /// Serial device; empty means try the usual device paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Calibration persistence configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default = "default_calibration_path")]
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; empty logs to stdout only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_bind_addr() -> IpAddr { IpAddr::from([0, 0, 0, 0]) }
fn default_base_port() -> u16 { 47000 }
fn default_stale_after_ms() -> u64 { 2000 }

fn default_render_interval_ms() -> u64 { 200 }
fn default_hold_ms() -> u64 { 1200 }
fn default_debounce_ms() -> u64 { 60 }
fn default_key_back() -> u16 { evdev::Key::KEY_ESC.code() }
fn default_key_next() -> u16 { evdev::Key::KEY_DOWN.code() }
fn default_key_prev() -> u16 { evdev::Key::KEY_UP.code() }
fn default_key_confirm() -> u16 { evdev::Key::KEY_ENTER.code() }

fn default_enabled_out() -> bool { true }
fn default_out_period_ms() -> u64 { 1000 }
fn default_talker() -> String { "WI".to_string() }
fn default_baud_rate() -> u32 { 4800 }

fn default_calibration_path() -> String { "./anemo-calibration.toml".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_port: default_base_port(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: default_render_interval_ms(),
            hold_ms: default_hold_ms(),
            debounce_ms: default_debounce_ms(),
            input_device: String::new(),
            key_back: default_key_back(),
            key_next: default_key_next(),
            key_prev: default_key_prev(),
            key_confirm: default_key_confirm(),
        }
    }
}

impl Default for NmeaConfig {
    fn default() -> Self {
        Self {
            enabled_out: default_enabled_out(),
            enabled_in: false,
            out_period_ms: default_out_period_ms(),
            talker: default_talker(),
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { path: default_calibration_path() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl LinkConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl UiConfig {
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn keymap(&self) -> KeyMap {
        KeyMap::from_codes(self.key_back, self.key_next, self.key_prev, self.key_confirm)
    }
}

impl NmeaConfig {
    pub fn output(&self) -> OutputConfig {
        OutputConfig {
            enabled: self.enabled_out,
            period: Duration::from_millis(self.out_period_ms),
            talker: self.talker.clone(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> AnemoError {
    AnemoError::Config(toml::de::Error::custom(msg))
}

fn check_range(name: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(format!("{} must be between {} and {}", name, min, max)));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use anemo_rx::config::Config;
    ///
    /// let config = Config::load("anemo-rx.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        check_range("stale_after_ms", self.link.stale_after_ms, 1, 60_000)?;

        if self.link.base_port < 1024 {
            return Err(invalid("base_port must be at least 1024"));
        }
        let top_channel_offset = (CHANNEL_MAX - CHANNEL_MIN) as u32;
        if self.link.base_port as u32 + top_channel_offset > u16::MAX as u32 {
            return Err(invalid(format!(
                "base_port must leave room for {} channels (at most {})",
                top_channel_offset + 1,
                u16::MAX as u32 - top_channel_offset
            )));
        }

        check_range("render_interval_ms", self.ui.render_interval_ms, 10, 5000)?;
        check_range("hold_ms", self.ui.hold_ms, 100, 10_000)?;
        check_range("debounce_ms", self.ui.debounce_ms, 1, 1000)?;

        let keys = [self.ui.key_back, self.ui.key_next, self.ui.key_prev, self.ui.key_confirm];
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(invalid(format!("key code {} is assigned to more than one button", key)));
            }
        }

        check_range("out_period_ms", self.nmea.out_period_ms, 100, 60_000)?;

        let talker = self.nmea.talker.as_bytes();
        if talker.len() != 2 || !talker.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(invalid("talker must be exactly two uppercase ASCII letters"));
        }

        if !ALLOWED_BAUD_RATES.contains(&self.nmea.baud_rate) {
            return Err(invalid("baud_rate must be one of: 4800, 9600, 38400, 115200"));
        }

        if self.calibration.path.trim().is_empty() {
            return Err(invalid("calibration path cannot be empty"));
        }

        Ok(())
    }
}
