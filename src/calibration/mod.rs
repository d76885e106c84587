//! # Calibration Module
//!
//! User calibration of the wind readings.
//!
//! This module handles:
//! - The calibration parameters and their valid ranges
//! - Range-checked edit steps used by the configuration screens
//! - Loading and saving the parameters to durable storage

pub mod settings;
pub mod store;
