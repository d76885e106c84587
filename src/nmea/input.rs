//! # Inbound NMEA
//!
//! Line assembly and classification of sentences arriving on the serial
//! port. Nothing inbound changes receiver state yet; proprietary sentences
//! are only logged.

use bytes::{BufMut, BytesMut};
use tracing::{info, trace};

use super::sentence::{validate_line, MAX_LINE_LEN, PROPRIETARY_PREFIX};

/// A checksum-valid inbound sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSentence {
    /// `$PANA,...` sentence addressed to this receiver
    Proprietary(String),
    /// Any other talker's sentence
    Standard(String),
}

/// Splits a byte stream into lines
///
/// CR is dropped and LF ends a line. A line growing past
/// [`MAX_LINE_LEN`] is discarded up to its terminating LF.
#[derive(Debug)]
pub struct LineAssembler {
    buf: BytesMut,
    overflowed: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(MAX_LINE_LEN + 1),
            overflowed: false,
        }
    }

    /// Feed one byte; returns a line when `byte` completes one
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let line = self.buf.split();
                if std::mem::take(&mut self.overflowed) {
                    trace!("Dropped overlong NMEA line");
                    return None;
                }
                if line.is_empty() {
                    return None;
                }
                match String::from_utf8(line.to_vec()) {
                    Ok(line) => Some(line),
                    Err(_) => {
                        trace!("Dropped non-text NMEA line");
                        None
                    }
                }
            }
            _ if self.overflowed => None,
            _ if self.buf.len() >= MAX_LINE_LEN => {
                self.buf.clear();
                self.overflowed = true;
                None
            }
            _ => {
                self.buf.put_u8(byte);
                None
            }
        }
    }

    /// Feed a chunk; returns every line it completes
    pub fn extend(&mut self, data: &[u8]) -> Vec<String> {
        data.iter().filter_map(|&b| self.push(b)).collect()
    }
}

/// Validate and classify a line; invalid lines yield `None`
#[must_use]
pub fn classify(line: &str) -> Option<InboundSentence> {
    if !validate_line(line) {
        trace!("Dropped invalid NMEA line: {:?}", line);
        return None;
    }

    if line.starts_with(PROPRIETARY_PREFIX) {
        Some(InboundSentence::Proprietary(line.to_string()))
    } else {
        Some(InboundSentence::Standard(line.to_string()))
    }
}

/// Handle one complete inbound line
pub fn handle_line(line: &str) -> Option<InboundSentence> {
    let sentence = classify(line)?;
    match &sentence {
        InboundSentence::Proprietary(text) => info!("NMEA in: {}", text),
        InboundSentence::Standard(text) => trace!("Ignoring NMEA sentence: {}", text),
    }
    Some(sentence)
}
