//! # NMEA Module
//!
//! NMEA 0183 output of the wind reading, plus optional inbound parsing.
//!
//! This module handles:
//! - Sentence checksums and validation
//! - Formatting `MWV` sentences at a fixed cadence with last-good hold
//! - Assembling and classifying inbound lines

pub mod input;
pub mod output;
pub mod sentence;
