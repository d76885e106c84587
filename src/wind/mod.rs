//! # Wind Frame Protocol Module
//!
//! Implementation of the fixed-layout wind telemetry frame sent by the
//! masthead sensor over the short-range wireless link.
//!
//! This module handles:
//! - The 28-byte packed little-endian frame layout
//! - Magic/version identification
//! - CRC16/Modbus checksum calculation
//! - All-or-nothing frame decoding with typed rejection reasons

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
