//! # Calibration Store
//!
//! Durable storage of [`CalibrationSettings`].
//!
//! The file backend keeps the four scalars under a fixed `[anemo]` table:
//!
//! ```toml
//! [anemo]
//! dir_off = -37
//! spd_fac = 2.5
//! spd_src = 1
//! esp_ch = 6
//! ```
//!
//! Loading never fails outward. A missing file, a missing key, a value of the
//! wrong type, or a value out of range falls back to the default for that
//! value only. Saving replaces the
//! whole file through a rename, so a failed save leaves the previous record
//! untouched.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::{Table, Value};
use tracing::{debug, info, warn};

use super::settings::{CalibrationSettings, SpeedSource, CHANNEL_MAX, CHANNEL_MIN, OFFSET_MAX_DEG, OFFSET_MIN_DEG};
use crate::error::{AnemoError, Result};

/// Load/save contract for calibration persistence
#[cfg_attr(test, mockall::automock)]
pub trait CalibrationStore: Send {
    /// Read persisted settings, substituting defaults for anything missing or invalid
    fn load(&self) -> CalibrationSettings;

    /// Persist all fields; on error nothing is changed
    fn save(&mut self, settings: &CalibrationSettings) -> Result<()>;
}

/// Table holding the calibration keys
const NAMESPACE: &str = "anemo";

/// On-disk layout
#[derive(Debug, Default, Serialize)]
struct CalibrationFile {
    anemo: StoredCalibration,
}

/// Raw persisted values, kept wide so out-of-range numbers survive parsing
/// and get clamped instead of rejected
#[derive(Debug, Default, Serialize)]
struct StoredCalibration {
    #[serde(skip_serializing_if = "Option::is_none")]
    dir_off: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spd_fac: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spd_src: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    esp_ch: Option<i64>,
}

/// Integer key; any other type is dropped
fn integer_key(table: &Table, key: &str) -> Option<i64> {
    match table.get(key)? {
        Value::Integer(v) => Some(*v),
        other => {
            warn!("Calibration key {} is a {}, using default", key, other.type_str());
            None
        }
    }
}

/// Numeric key; integers are accepted as well as floats
fn float_key(table: &Table, key: &str) -> Option<f64> {
    match table.get(key)? {
        Value::Float(v) => Some(*v),
        Value::Integer(v) => Some(*v as f64),
        other => {
            warn!("Calibration key {} is a {}, using default", key, other.type_str());
            None
        }
    }
}

impl StoredCalibration {
    /// Pick each key out of the namespace table on its own
    fn from_table(table: &Table) -> Self {
        Self {
            dir_off: integer_key(table, "dir_off"),
            spd_fac: float_key(table, "spd_fac"),
            spd_src: integer_key(table, "spd_src"),
            esp_ch: integer_key(table, "esp_ch"),
        }
    }

    fn into_settings(self) -> CalibrationSettings {
        let defaults = CalibrationSettings::default();

        CalibrationSettings {
            direction_offset_deg: self
                .dir_off
                .map(|v| v.clamp(OFFSET_MIN_DEG as i64, OFFSET_MAX_DEG as i64) as i16)
                .unwrap_or(defaults.direction_offset_deg),
            speed_factor: self
                .spd_fac
                .map(|v| v as f32)
                .unwrap_or(defaults.speed_factor),
            speed_source: self
                .spd_src
                .and_then(SpeedSource::from_code)
                .unwrap_or(defaults.speed_source),
            channel: self
                .esp_ch
                .map(|v| v.clamp(CHANNEL_MIN as i64, CHANNEL_MAX as i64) as u8)
                .unwrap_or(defaults.channel),
        }
        .sanitized()
    }
}

impl From<&CalibrationSettings> for StoredCalibration {
    fn from(settings: &CalibrationSettings) -> Self {
        Self {
            dir_off: Some(settings.direction_offset_deg as i64),
            spd_fac: Some(settings.speed_factor as f64),
            spd_src: Some(settings.speed_source.code() as i64),
            esp_ch: Some(settings.channel as i64),
        }
    }
}

/// TOML file backed calibration store
#[derive(Debug, Clone)]
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomically(&self, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        let result = (|| {
            let mut file = fs::File::create(&temp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&self) -> CalibrationSettings {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No calibration at {}, using defaults", self.path.display());
                return CalibrationSettings::default();
            }
            Err(e) => {
                warn!("Cannot read calibration {}: {}, using defaults", self.path.display(), e);
                return CalibrationSettings::default();
            }
        };

        let document: Table = match contents.parse() {
            Ok(document) => document,
            Err(e) => {
                warn!("Calibration {} is malformed: {}, using defaults", self.path.display(), e);
                return CalibrationSettings::default();
            }
        };

        let stored = match document.get(NAMESPACE) {
            Some(Value::Table(table)) => StoredCalibration::from_table(table),
            Some(other) => {
                warn!("Calibration [{}] is a {}, using defaults", NAMESPACE, other.type_str());
                StoredCalibration::default()
            }
            None => StoredCalibration::default(),
        };

        let settings = stored.into_settings();
        debug!("Loaded calibration: {:?}", settings);
        settings
    }

    fn save(&mut self, settings: &CalibrationSettings) -> Result<()> {
        let file = CalibrationFile {
            anemo: StoredCalibration::from(&settings.sanitized()),
        };
        let contents = toml::to_string(&file)
            .map_err(|e| AnemoError::Calibration(format!("Failed to serialize: {}", e)))?;

        self.write_atomically(&contents).map_err(|e| {
            AnemoError::Calibration(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        info!("Calibration saved to {}", self.path.display());
        Ok(())
    }
}
