//! # Anemo RX Library
//!
//! Receiver side of a wireless masthead wind sensor.
//!
//! The sensor broadcasts fixed 28-byte frames over UDP. This library
//! validates them, tracks link quality, applies the user's calibration and
//! turns the result into NMEA 0183 `MWV` sentences, with a small four-button
//! UI for adjusting the calibration in the field.

pub mod app;
pub mod calibration;
pub mod config;
pub mod error;
pub mod link;
pub mod measurement;
pub mod nmea;
pub mod serial;
pub mod ui;
pub mod wind;
