//! # Serial Communication Module
//!
//! Handles the NMEA 0183 serial port.
//!
//! This module handles:
//! - Opening the port at the configured baud rate (4800 8N1 by default)
//! - Writing sentences handed over by the main loop
//! - Reading inbound lines when inbound NMEA is enabled

pub mod port_trait;

use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{AnemoError, Result};
use crate::nmea::input::{handle_line, InboundSentence, LineAssembler};
use port_trait::{SerialPortIO, TokioSerialPort};

/// NMEA 0183 standard baud rate
pub const NMEA_BAUD_RATE: u32 = 4800;

/// Baud rates accepted in the configuration
pub const ALLOWED_BAUD_RATES: &[u32] = &[4800, 9600, 38400, 115200];

/// Device paths tried when none is configured (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyAMA0", // Raspberry Pi PL011 UART
    "/dev/ttyS0",   // on-board UART
];

/// Opened NMEA serial port
pub struct NmeaSerial {
    port: TokioSerialPort,
    device_path: String,
}

impl std::fmt::Debug for NmeaSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmeaSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl NmeaSerial {
    /// Open the first default device path that works
    pub fn open(baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
    }

    /// Open the first of `paths` that works
    ///
    /// # Errors
    ///
    /// `SerialPortNotFound` listing every path tried when none opens.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened NMEA port {} at {} baud", path, baud_rate);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(AnemoError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| AnemoError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Give up the handle for use by [`run_sentence_sink`]
    pub fn into_port(self) -> TokioSerialPort {
        self.port
    }
}

/// What a sentence sink did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub sentences_written: u64,
    pub proprietary_received: u64,
}

/// Own the port: write every outbound sentence, optionally read inbound lines
///
/// Inbound bytes are drained before outbound sentences are written. Returns
/// when the sender side of `sentences` is dropped.
///
/// # Errors
///
/// `Serial` on a failed write or read; the port is given up at that point.
pub async fn run_sentence_sink<P: SerialPortIO>(
    mut port: P,
    mut sentences: mpsc::Receiver<String>,
    inbound_enabled: bool,
) -> Result<SinkStats> {
    let mut stats = SinkStats::default();
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 128];

    loop {
        tokio::select! {
            biased;

            read = port.read(&mut buf), if inbound_enabled => {
                let n = read.map_err(|e| AnemoError::Serial(format!("Failed to read: {}", e)))?;
                if n == 0 {
                    return Err(AnemoError::Serial("serial port closed".to_string()));
                }
                for line in assembler.extend(&buf[..n]) {
                    if let Some(InboundSentence::Proprietary(_)) = handle_line(&line) {
                        stats.proprietary_received += 1;
                    }
                }
            }

            sentence = sentences.recv() => {
                let Some(sentence) = sentence else {
                    debug!("Sentence channel closed");
                    break;
                };

                port.write_all(sentence.as_bytes())
                    .await
                    .map_err(|e| AnemoError::Serial(format!("Failed to write sentence: {}", e)))?;
                port.flush()
                    .await
                    .map_err(|e| AnemoError::Serial(format!("Failed to flush serial port: {}", e)))?;
                stats.sentences_written += 1;
            }
        }
    }

    Ok(stats)
}
