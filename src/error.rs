//! # Error Types
//!
//! Custom error types for Anemo RX using `thiserror`.
//!
//! Malformed radio frames are not errors of this kind: they are tallied by the
//! link receiver as [`crate::wind::decoder::FrameRejection`] and never bubble up.

use thiserror::Error;

/// Main error type for Anemo RX
#[derive(Debug, Error)]
pub enum AnemoError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Calibration persistence errors
    #[error("Calibration store error: {0}")]
    Calibration(String),

    /// Link transport errors (socket bind, receive)
    #[error("Link transport error: {0}")]
    Link(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No usable serial port among the candidates
    #[error("No serial port could be opened (tried: {0})")]
    SerialPortNotFound(String),

    /// Button input device errors
    #[error("Input device error: {0}")]
    Input(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Anemo RX
pub type Result<T> = std::result::Result<T, AnemoError>;
